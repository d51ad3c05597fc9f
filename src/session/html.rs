//! WAN IP extraction from the modem's status page.

use scraper::{Html, Selector};

use crate::error::SessionError;

/// Find the WAN IP reported by `statusview.cgi`.
///
/// The page marks the value with the DOM id `DeviceInfo_WanIP`; the
/// selector is anchored under `body` so a stray id in the head section
/// can never match. An expired session serves a redirect stub without
/// the element at all, which surfaces as [`SessionError::WanIpElementNotFound`].
pub fn extract_wan_ip(body: &str) -> Result<String, SessionError> {
    let document = Html::parse_document(body);
    let selector = Selector::parse(r#"body [id="DeviceInfo_WanIP"]"#)
        .map_err(|e| SessionError::Scrape(e.to_string()))?;

    let element = document
        .select(&selector)
        .next()
        .ok_or(SessionError::WanIpElementNotFound)?;

    // The cell mixes the address with nbsp padding and a disconnect
    // button; the first non-empty text chunk is the address.
    element
        .text()
        .map(str::trim)
        .find(|chunk| !chunk.is_empty())
        .map(str::to_string)
        .ok_or(SessionError::WanIpTextNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Trimmed and anonymised statusview.cgi response content.
    const STATUS_VIEW_BODY: &str = r#"
<html><head><meta http-equiv="Content-Type" content="text/html hhh; charset=iso-8859-1"></head><body>
<div class="title" style="color:#CCC;"><span id="SystemInfo_ConnectionStatus"></span></div>
<table width="96%" cellspacing="0" cellpadding="0" border="0" align="left">
<tbody>
<tr>
<td valign="top"><div class="w_text3">
<table class="table_frame" width="96%" cellspacing="0" cellpadding="0" border="0" align="center">
<tbody>
    <tr>
    <td class="table_font">&nbsp;&nbsp;-  <span id="MLG_IP_Address2"></span>: </td>
    <td class="table_font w_blue" id="DeviceInfo_WanIP">
192.0.2.138&nbsp;&nbsp;<input type="button" name="Disconnect" maxlength="32" value="Disconnect" onclick="reconnect(2)">
</td>
    </tr>
    <tr>
    <td class="table_font">&nbsp;&nbsp;- <span id="MLG_Default_Gateway"></span>:</td>
    <td class="table_font w_blue" id="DeviceInfo_gateway">
198.51.100.200
</td>
    </tr>
</tbody></table>
</div></td>
</tr></tbody></table>
</body></html>"#;

    // Response shape served once the session has expired.
    const LOGIN_REDIRECT_BODY: &str = r#"
<html><head>
<title></title>
<meta http-equiv="Cache-Control" CONTENT="no-cache">
</head>
<body></body>
<script language="JavaScript">
top.location.href = "http://192.168.1.1/cgi-bin/login.html";
</script>
</html>"#;

    #[test]
    fn test_extract_wan_ip_connected() {
        let ip = extract_wan_ip(STATUS_VIEW_BODY).unwrap();
        assert_eq!(ip, "192.0.2.138");
    }

    #[test]
    fn test_extract_wan_ip_missing_element() {
        let err = extract_wan_ip(LOGIN_REDIRECT_BODY).unwrap_err();
        assert!(matches!(err, SessionError::WanIpElementNotFound));
    }

    #[test]
    fn test_extract_wan_ip_empty_element() {
        let body = r#"<html><body><span id="DeviceInfo_WanIP">  &nbsp; </span></body></html>"#;
        let err = extract_wan_ip(body).unwrap_err();
        assert!(matches!(err, SessionError::WanIpTextNotFound));
    }

    #[test]
    fn test_head_section_is_not_searched() {
        let body = concat!(
            r#"<html><head><meta id="DeviceInfo_WanIP" content="10.0.0.1"></head>"#,
            r#"<body></body></html>"#
        );
        let err = extract_wan_ip(body).unwrap_err();
        assert!(matches!(err, SessionError::WanIpElementNotFound));
    }
}
