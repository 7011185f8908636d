//! Minimal owned XML element tree read and written with `quick-xml`.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::{CrawlError, Result};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: Option<String>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.set_text(Some(text.into()));
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Sets the text, treating empty text as absent.
    pub fn set_text(&mut self, text: Option<String>) {
        self.text = text.filter(|t| !t.is_empty());
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attribute(&mut self, key: &str, value: &str) {
        match self.attributes.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value.to_string(),
            None => self.attributes.push((key.to_string(), value.to_string())),
        }
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.children.iter_mut().find(|c| c.name == name)
    }

    /// Follows a path of child names from this element.
    pub fn find(&self, path: &[&str]) -> Option<&Element> {
        path.iter().try_fold(self, |el, name| el.child(name))
    }

    pub fn find_mut(&mut self, path: &[&str]) -> Option<&mut Element> {
        path.iter().try_fold(self, |el, name| el.child_mut(name))
    }

    /// Text of the element at `path`, if it exists and has text.
    pub fn text_at(&self, path: &[&str]) -> Option<&str> {
        self.find(path).and_then(|el| el.text.as_deref())
    }

    /// Visits this element and all descendants, parents first.
    pub fn walk_mut(&mut self, f: &mut impl FnMut(&mut Element)) {
        f(self);
        for child in &mut self.children {
            child.walk_mut(f);
        }
    }

    /// Removes every descendant whose name satisfies `pred`.
    pub fn remove_descendants(&mut self, pred: &impl Fn(&str) -> bool) {
        self.children.retain(|c| !pred(&c.name));
        for child in &mut self.children {
            child.remove_descendants(pred);
        }
    }

    pub fn parse(xml: &str) -> Result<Element> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<Element> = Vec::new();
        let mut root = None;

        loop {
            match reader.read_event().map_err(CrawlError::xml)? {
                Event::Start(start) => stack.push(element_from_start(&start)?),
                Event::Empty(start) => {
                    let element = element_from_start(&start)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| CrawlError::xml("unbalanced end tag"))?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => {
                    let text = text.unescape().map_err(CrawlError::xml)?;
                    append_text(&mut stack, &text);
                }
                Event::CData(data) => {
                    let data = data.into_inner();
                    append_text(&mut stack, &String::from_utf8_lossy(&data));
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(CrawlError::xml("unexpected end of document"));
        }
        root.ok_or_else(|| CrawlError::xml("document has no root element"))
    }

    /// Serializes the tree with an XML declaration and two-space indentation.
    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(CrawlError::xml)?;
        self.write(&mut writer)?;
        String::from_utf8(writer.into_inner()).map_err(CrawlError::xml)
    }

    fn write(&self, writer: &mut Writer<Vec<u8>>) -> Result<()> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.children.is_empty() && self.text.is_none() {
            return writer
                .write_event(Event::Empty(start))
                .map_err(CrawlError::xml);
        }

        writer
            .write_event(Event::Start(start))
            .map_err(CrawlError::xml)?;
        if let Some(text) = &self.text {
            writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(CrawlError::xml)?;
        }
        for child in &self.children {
            child.write(writer)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new(self.name.as_str())))
            .map_err(CrawlError::xml)
    }
}

fn element_from_start(start: &BytesStart) -> Result<Element> {
    let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()));
    for attr in start.attributes() {
        let attr = attr.map_err(CrawlError::xml)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(CrawlError::xml)?;
        element.attributes.push((key, value.into_owned()));
    }
    Ok(element)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(CrawlError::xml("multiple root elements")),
    }
    Ok(())
}

fn append_text(stack: &mut [Element], text: &str) {
    if let Some(current) = stack.last_mut() {
        let mut combined = current.text.take().unwrap_or_default();
        combined.push_str(text);
        current.set_text(Some(combined));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_document() {
        let xml = r#"<?xml version="1.0"?>
            <metadata xml:lang="en">
                <!-- comment -->
                <Esri><CreaDate>20210520</CreaDate></Esri>
                <dataIdInfo>
                    <idCitation xmlns=""><resTitle>Roads &amp; Rails</resTitle></idCitation>
                    <role><RoleCd value="006"/></role>
                </dataIdInfo>
            </metadata>"#;

        let root = Element::parse(xml).unwrap();
        assert_eq!(root.name, "metadata");
        assert_eq!(root.attribute("xml:lang"), Some("en"));
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.text_at(&["Esri", "CreaDate"]), Some("20210520"));
        assert_eq!(
            root.text_at(&["dataIdInfo", "idCitation", "resTitle"]),
            Some("Roads & Rails")
        );
        let role = root.find(&["dataIdInfo", "role", "RoleCd"]).unwrap();
        assert_eq!(role.attribute("value"), Some("006"));
        assert!(role.text.is_none());
    }

    #[test]
    fn test_serialized_tree_parses_back_identically() {
        let root = Element::new("metadata")
            .with_child(Element::new("mdFileID").with_text("file://C:/data/a<b>.shp"))
            .with_child(Element::new("empty"))
            .with_child(
                Element::new("distInfo").with_child(Element::new("linkage").with_text("x & y")),
            );
        let xml = root.to_xml().unwrap();
        assert!(xml.starts_with("<?xml"));
        assert_eq!(Element::parse(&xml).unwrap(), root);
    }

    #[test]
    fn test_rejects_malformed_documents() {
        assert!(Element::parse("").is_err());
        assert!(Element::parse("<a><b></a>").is_err());
        assert!(Element::parse("<a></a><b></b>").is_err());
    }

    #[test]
    fn test_remove_descendants() {
        let mut root = Element::new("metadata")
            .with_child(Element::new("idinfo"))
            .with_child(Element::new("keep").with_child(Element::new("idinfo")));
        root.remove_descendants(&|name| name == "idinfo");
        assert_eq!(root.children.len(), 1);
        assert!(root.children[0].children.is_empty());
    }
}
