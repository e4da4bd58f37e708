use std::io::Cursor;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::error::{TemplateError, TemplateResult};
use crate::source::TemplateSource;

/// Encoding of a template stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    /// `---` separated YAML documents.
    Yaml,
    /// Concatenated JSON objects.
    Json,
}

impl Format {
    /// JSON if the first non-whitespace byte opens an object, YAML otherwise.
    pub fn sniff(data: &[u8]) -> Self {
        match data.iter().find(|b| !b.is_ascii_whitespace()) {
            Some(b'{') => Self::Json,
            _ => Self::Yaml,
        }
    }
}

type JsonStream<T> = serde_json::StreamDeserializer<'static, serde_json::de::IoRead<Cursor<Vec<u8>>>, T>;

enum Stream<T> {
    Yaml(serde_yaml::Deserializer<'static>),
    Json(JsonStream<T>),
}

/// Lazily decoded documents of one [`TemplateSource`].
///
/// Yields one item per non-empty document in stream order. Decoding stops
/// after the first malformed document; nothing past it is produced. Empty
/// YAML documents (`---` with no content) are skipped but still count
/// towards document positions.
pub struct Documents<'a, T> {
    origin: String,
    stream: Stream<T>,
    index: usize,
    finished: bool,
    defaults: Option<Box<dyn FnMut(&mut T) + 'a>>,
}

/// Decode the documents of `source` as `T`.
pub fn decode<'a, T: DeserializeOwned>(source: TemplateSource) -> Documents<'a, T> {
    let format = Format::sniff(&source.data);
    debug!(origin = %source.origin, ?format, bytes = source.data.len(), "decoding templates");
    let reader = Cursor::new(source.data);
    let stream = match format {
        Format::Yaml => Stream::Yaml(serde_yaml::Deserializer::from_reader(reader)),
        Format::Json => Stream::Json(serde_json::Deserializer::from_reader(reader).into_iter()),
    };
    Documents {
        origin: source.origin,
        stream,
        index: 0,
        finished: false,
        defaults: None,
    }
}

impl<'a, T: DeserializeOwned> Documents<'a, T> {
    /// Apply `defaults` to every successfully decoded document before it is
    /// yielded.
    pub fn with_defaults(mut self, defaults: impl FnMut(&mut T) + 'a) -> Self {
        self.defaults = Some(Box::new(defaults));
        self
    }

    /// Where the documents come from.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// 1-based position of the most recently read document.
    pub fn position(&self) -> usize {
        self.index
    }

    fn malformed(&mut self, reason: impl ToString) -> TemplateError {
        self.finished = true;
        TemplateError::Malformed {
            origin: self.origin.clone(),
            index: self.index,
            reason: reason.to_string(),
        }
    }

    fn next_yaml(&mut self) -> Option<TemplateResult<T>> {
        loop {
            let Stream::Yaml(de) = &mut self.stream else {
                return None;
            };
            let document = de.next()?;
            self.index += 1;
            let value = match serde_yaml::Value::deserialize(document) {
                Ok(value) => value,
                Err(e) => return Some(Err(self.malformed(e))),
            };
            if value.is_null() {
                continue;
            }
            return Some(serde_yaml::from_value(value).map_err(|e| self.malformed(e)));
        }
    }

    fn next_json(&mut self) -> Option<TemplateResult<T>> {
        let Stream::Json(de) = &mut self.stream else {
            return None;
        };
        let item = de.next()?;
        self.index += 1;
        Some(item.map_err(|e| self.malformed(e)))
    }
}

impl<T: DeserializeOwned> Iterator for Documents<'_, T> {
    type Item = TemplateResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let item = match self.stream {
            Stream::Yaml(_) => self.next_yaml(),
            Stream::Json(_) => self.next_json(),
        };
        match item {
            None => {
                self.finished = true;
                None
            }
            Some(Ok(mut doc)) => {
                if let Some(defaults) = self.defaults.as_mut() {
                    defaults(&mut doc);
                }
                Some(Ok(doc))
            }
            Some(Err(e)) => Some(Err(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdarc_types::{Relation, ResourceTemplate, Source};

    fn yaml(data: &str) -> TemplateSource {
        TemplateSource::from_bytes("test.yaml", ".", data)
    }

    #[test]
    fn sniffing() {
        assert_eq!(Format::sniff(b"  \n{\"name\":1}"), Format::Json);
        assert_eq!(Format::sniff(b"name: x"), Format::Yaml);
        assert_eq!(Format::sniff(b"---\nname: x"), Format::Yaml);
        assert_eq!(Format::sniff(b""), Format::Yaml);
    }

    #[test]
    fn yaml_documents_in_order() {
        let docs: Vec<Source> = decode(yaml(
            "name: a\nversion: 1.0.0\ntype: git\n---\nname: b\nversion: 1.0.0\ntype: git\n",
        ))
        .collect::<TemplateResult<_>>()
        .unwrap();
        let names: Vec<_> = docs.iter().map(|s| s.meta.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn json_stream() {
        let source = TemplateSource::from_bytes(
            "test.json",
            ".",
            r#"{"name":"a","version":"1.0.0","type":"git"}
               {"name":"b","version":"1.0.0","type":"git"}"#,
        );
        let docs: Vec<Source> = decode(source).collect::<TemplateResult<_>>().unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1].meta.name, "b");
    }

    #[test]
    fn empty_stream_is_not_an_error() {
        assert_eq!(decode::<Source>(yaml("")).count(), 0);
        assert_eq!(decode::<Source>(yaml("# only a comment\n")).count(), 0);
    }

    #[test]
    fn empty_documents_are_skipped_but_counted() {
        let mut docs = decode::<Source>(yaml(
            "---\nname: a\nversion: 1.0.0\ntype: git\n---\n---\nname: b\nversion: 1.0.0\ntype: git\n",
        ));
        assert_eq!(docs.next().unwrap().unwrap().meta.name, "a");
        assert_eq!(docs.position(), 1);
        assert_eq!(docs.next().unwrap().unwrap().meta.name, "b");
        assert_eq!(docs.position(), 3);
        assert_eq!(docs.origin(), "test.yaml");
        assert!(docs.next().is_none());
    }

    #[test]
    fn malformed_document_stops_the_stream() {
        let mut docs = decode::<ResourceTemplate>(yaml(
            "name: ok\nversion: 1.0.0\ntype: blob\n---\nname: bad\nrelation: sideways\n---\nname: never\n",
        ));
        assert!(docs.next().unwrap().is_ok());
        let err = docs.next().unwrap().unwrap_err();
        assert_eq!(err.document_index(), Some(2));
        assert!(err.to_string().contains("test.yaml"));
        assert!(docs.next().is_none());
    }

    #[test]
    fn yaml_syntax_error_is_malformed() {
        let mut docs = decode::<Source>(yaml("name: [unterminated\n"));
        let err = docs.next().unwrap().unwrap_err();
        assert!(matches!(err, TemplateError::Malformed { index: 1, .. }));
        assert!(docs.next().is_none());
    }

    #[test]
    fn defaults_are_applied_per_document() {
        let docs: Vec<ResourceTemplate> = decode(yaml(
            "name: cfg\ntype: json\nrelation: local\n---\nname: img\ntype: ociImage\nrelation: external\n",
        ))
        .with_defaults(|t: &mut ResourceTemplate| {
            if t.resource.relation == Some(Relation::Local) && t.resource.meta.version.is_empty() {
                t.resource.meta.version = "1.2.3".into();
            }
        })
        .collect::<TemplateResult<_>>()
        .unwrap();
        assert_eq!(docs[0].resource.meta.version, "1.2.3");
        assert!(docs[1].resource.meta.version.is_empty());
    }
}
