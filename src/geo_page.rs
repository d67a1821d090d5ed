//! Scraping of the free-text "Overall design" field from a GEO accession page.

use std::sync::LazyLock;

use regex::{Captures, Regex};

static LABEL_CELL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<(?i:td)\b[^>]*>Overall design</(?i:td)\s*>").unwrap()
});
static ROW_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)</tr\s*>").unwrap());
static VALUE_CELL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<td\b([^>]*)>(.*?)</td\s*>").unwrap());
static STYLE_ATTR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bstyle\s*=").unwrap());
static LINE_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesignMiss {
    /// The page has no cell labelled "Overall design".
    LabelMissing,
    /// The label exists but no styled value cell follows it in the same row.
    ValueMissing,
}

pub fn detail_page_url(geo_base: &str, accession: &str) -> String {
    format!("{geo_base}?acc={}", accession.trim().to_uppercase())
}

/// Finds the "Overall design" label cell and returns the text of the next
/// cell in its row. That cell must carry a `style` attribute.
pub fn extract_overall_design(html: &str) -> Result<String, DesignMiss> {
    let label = LABEL_CELL.find(html).ok_or(DesignMiss::LabelMissing)?;
    let rest = &html[label.end()..];
    let row = match ROW_END.find(rest) {
        Some(end) => &rest[..end.start()],
        None => rest,
    };
    let caps = VALUE_CELL.captures(row).ok_or(DesignMiss::ValueMissing)?;
    if !STYLE_ATTR.is_match(&caps[1]) {
        return Err(DesignMiss::ValueMissing);
    }
    Ok(cell_text(&caps[2]))
}

fn cell_text(inner_html: &str) -> String {
    let with_breaks = LINE_BREAK.replace_all(inner_html, "\n");
    let stripped = TAG.replace_all(&with_breaks, "");
    decode_entities(&stripped).trim().to_string()
}

fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures<'_>| {
            let name = &caps[1];
            let decoded = if let Some(hex) = name
                .strip_prefix("#x")
                .or_else(|| name.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = name.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match name {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some(' '),
                    _ => None,
                }
            };
            decoded
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
<table>
<tr valign="top"><td nowrap>Summary</td>
<td style="text-align: justify">Some summary<br></td>
</tr>
<tr valign="top"><td nowrap>Overall design</td>
<td style="text-align: justify">Refer to individual Series &amp; samples<br>n=3 per group</td>
</tr>
</table>"#;

    #[test]
    fn reads_value_next_to_label() {
        let design = extract_overall_design(PAGE).unwrap();
        assert_eq!(design, "Refer to individual Series & samples\nn=3 per group");
    }

    #[test]
    fn missing_label() {
        let html = "<table><tr><td>Summary</td><td>x</td></tr></table>";
        assert_eq!(extract_overall_design(html), Err(DesignMiss::LabelMissing));
    }

    #[test]
    fn label_without_value_cell() {
        let html = "<tr><td>Overall design</td></tr><tr><td>other row</td></tr>";
        assert_eq!(extract_overall_design(html), Err(DesignMiss::ValueMissing));
    }

    #[test]
    fn label_must_match_exactly() {
        let html = "<tr><td>Overall design notes</td><td>x</td></tr>";
        assert_eq!(extract_overall_design(html), Err(DesignMiss::LabelMissing));
    }

    #[test]
    fn label_with_padding_is_not_the_label() {
        let html = r#"<tr><td> Overall design </td><td style="x">v</td></tr>"#;
        assert_eq!(extract_overall_design(html), Err(DesignMiss::LabelMissing));
    }

    #[test]
    fn value_cell_without_style_is_rejected() {
        let html = "<tr valign=\"top\"><td nowrap>Overall design</td>\n<td>unstyled value</td>\n</tr>";
        assert_eq!(extract_overall_design(html), Err(DesignMiss::ValueMissing));
    }

    #[test]
    fn styled_value_decodes_numeric_entities() {
        let html = r#"<tr><td>Overall design</td><td style="text-align: justify">plain &#233;tude</td></tr>"#;
        assert_eq!(extract_overall_design(html).unwrap(), "plain étude");
    }

    #[test]
    fn url_uppercases_accession() {
        assert_eq!(
            detail_page_url("https://geo.example/acc.cgi", "gse1234"),
            "https://geo.example/acc.cgi?acc=GSE1234"
        );
    }
}
