//! Selector engine boundary
//!
//! The walker only needs two capabilities from a parsed page: resolve a CSS
//! selector to nodes in document order, and read a node's text or one of its
//! attributes. `scraper::Html` provides both.

use scraper::{ElementRef, Html, Selector};

/// A matched node
pub trait Node {
    /// Concatenated text of the node and its descendants, untrimmed
    fn text(&self) -> String;

    /// Value of attribute `name`, if the node has it
    fn attribute(&self, name: &str) -> Option<String>;
}

/// A parsed document that can resolve selectors
pub trait Document {
    /// All nodes matching `selector`, in document order
    fn find<'a>(&'a self, selector: &str) -> Result<Vec<Box<dyn Node + 'a>>, String>;
}

impl Node for ElementRef<'_> {
    fn text(&self) -> String {
        ElementRef::text(self).collect()
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.value().attr(name).map(String::from)
    }
}

impl Document for Html {
    fn find<'a>(&'a self, selector: &str) -> Result<Vec<Box<dyn Node + 'a>>, String> {
        let selector = Selector::parse(selector).map_err(|e| e.to_string())?;

        Ok(self
            .select(&selector)
            .map(|el| Box::new(el) as Box<dyn Node + 'a>)
            .collect())
    }
}

/// Parse a full HTML document
pub fn parse_html(html: &str) -> Html {
    Html::parse_document(html)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_in_document_order() {
        let html = r#"
        <html>
        <body>
            <div class="price">$19.99</div>
            <div class="price">$29.99</div>
            <a href="/product/123" class="link">Product</a>
        </body>
        </html>
        "#;
        let document = parse_html(html);

        let prices = document.find(".price").unwrap();
        assert_eq!(prices.len(), 2);
        assert_eq!(prices[0].text(), "$19.99");
        assert_eq!(prices[1].text(), "$29.99");

        let links = document.find(".link").unwrap();
        assert_eq!(links[0].attribute("href").as_deref(), Some("/product/123"));
        assert_eq!(links[0].attribute("title"), None);
    }

    #[test]
    fn test_text_is_not_trimmed() {
        let document = parse_html("<p>  spaced <b>out</b> </p>");
        let nodes = document.find("p").unwrap();
        assert_eq!(nodes[0].text(), "  spaced out ");
    }

    #[test]
    fn test_no_match_is_empty() {
        let document = parse_html("<p>x</p>");
        assert!(document.find("h1").unwrap().is_empty());
    }

    #[test]
    fn test_invalid_selector() {
        let document = parse_html("<p>x</p>");
        assert!(document.find("p[").is_err());
    }
}
