use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::{Declaration, Document, Element, NodeKind, DOCUMENT};
use crate::error::{ConvertError, Result};

/// Parse a whole XML document, keeping whitespace text inside the root.
pub fn parse(text: &str) -> Result<Document> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(false);

    let mut doc = Document::empty();
    let mut stack: Vec<usize> = vec![DOCUMENT];

    loop {
        let top = *stack.last().unwrap_or(&DOCUMENT);
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let id = doc.append(top, NodeKind::Element(element_from(&e)?));
                stack.push(id);
            }
            Ok(Event::Empty(e)) => {
                doc.append(top, NodeKind::Element(element_from(&e)?));
            }
            Ok(Event::End(_)) => {
                if stack.len() > 1 {
                    stack.pop();
                }
            }
            Ok(Event::Text(t)) => {
                let value = t
                    .unescape()
                    .map_err(|err| ConvertError::xml("text", err))?
                    .into_owned();
                if top == DOCUMENT && value.trim().is_empty() {
                    continue;
                }
                doc.append(top, NodeKind::Text(value));
            }
            Ok(Event::CData(c)) => {
                doc.append(top, NodeKind::CData(String::from_utf8_lossy(&c).into_owned()));
            }
            Ok(Event::Comment(c)) => {
                doc.append(top, NodeKind::Comment(String::from_utf8_lossy(&c).into_owned()));
            }
            Ok(Event::PI(pi)) => {
                let target = String::from_utf8_lossy(pi.target()).into_owned();
                let data = String::from_utf8_lossy(pi.content()).trim().to_string();
                doc.append(top, NodeKind::Pi { target, data });
            }
            Ok(Event::Decl(d)) => {
                let version = d
                    .version()
                    .map(|v| String::from_utf8_lossy(&v).into_owned())
                    .unwrap_or_else(|_| "1.0".to_string());
                let encoding = d
                    .encoding()
                    .and_then(|r| r.ok())
                    .map(|v| String::from_utf8_lossy(&v).into_owned());
                let standalone = d
                    .standalone()
                    .and_then(|r| r.ok())
                    .map(|v| String::from_utf8_lossy(&v).into_owned());
                doc.append(
                    top,
                    NodeKind::Decl(Declaration {
                        version,
                        encoding,
                        standalone,
                    }),
                );
            }
            Ok(Event::DocType(d)) => {
                doc.append(
                    top,
                    NodeKind::DocType(String::from_utf8_lossy(&d).trim().to_string()),
                );
            }
            Ok(Event::Eof) => break,
            Err(err) => return Err(ConvertError::xml("document", err)),
        }
    }

    let root = doc.child_elements(DOCUMENT).next();
    doc.root = root.ok_or_else(|| ConvertError::xml("document", "no root element"))?;
    Ok(doc)
}

fn element_from(e: &BytesStart) -> Result<Element> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| ConvertError::xml(&name, err))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| ConvertError::xml(&name, err))?
            .into_owned();
        attributes.push((key, value));
    }
    Ok(Element { name, attributes })
}
