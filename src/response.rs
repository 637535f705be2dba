use serde_json::Value;

use crate::classify::{ClassifierOptions, ErrorClassifier};
use crate::error::Error;
use crate::mapping::directives::Mappable;
use crate::mapping::{Mapped, Mapper, MapperOptions};

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(default)]
pub struct ProcessorOptions {
    pub mapping: MapperOptions,
    pub classifier: ClassifierOptions,
}

/// Classify first, then map. A body carrying an `error` never reaches the
/// mapper.
#[derive(Debug, Clone, Default)]
pub struct ResponseProcessor {
    mapper: Mapper,
    classifier: ErrorClassifier,
}

impl ResponseProcessor {
    pub fn new(options: ProcessorOptions) -> Self {
        Self {
            mapper: Mapper::new(options.mapping),
            classifier: ErrorClassifier::new(options.classifier),
        }
    }

    /// Build from a JSON options document, e.g. a config file section.
    pub fn from_json_options(options: &str) -> Result<Self, Error> {
        Ok(Self::new(serde_json::from_str(options)?))
    }

    pub fn mapper(&self) -> &Mapper {
        &self.mapper
    }

    pub fn classifier(&self) -> &ErrorClassifier {
        &self.classifier
    }

    pub fn process<T: Mappable>(&self, body: &str, http_status: u16) -> Result<T, Error> {
        let json = self.classifier.classify_text(body, http_status)?;
        Ok(self.mapper.map(&json)?)
    }

    /// Like [`process`](Self::process), also returning the fields skipped
    /// under the lenient policy.
    pub fn process_with_report<T: Mappable>(
        &self,
        body: &str,
        http_status: u16,
    ) -> Result<Mapped<T>, Error> {
        let json = self.classifier.classify_text(body, http_status)?;
        Ok(self.mapper.map_with_report(&json)?)
    }

    /// For bodies that are a bare array or a `{"data": [...]}` envelope.
    pub fn process_list<T: Mappable>(&self, body: &str, http_status: u16) -> Result<Vec<T>, Error> {
        let json = self.classifier.classify_text(body, http_status)?;
        Ok(self.mapper.map_list(&json)?)
    }

    /// Same as [`process`](Self::process) for an already parsed body.
    pub fn process_value<T: Mappable>(&self, body: &Value, http_status: u16) -> Result<T, Error> {
        self.classifier.classify(body, http_status)?;
        Ok(self.mapper.map(body)?)
    }
}
