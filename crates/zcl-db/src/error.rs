use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("xml parse error in {file}: {source}")]
    Xml {
        file: String,
        #[source]
        source: quick_xml::Error,
    },
    #[error("malformed schema element: {0}")]
    Malformed(String),
    #[error("unknown data type short name: {0}")]
    UnknownDataType(String),
    #[error("missing required attribute `{attr}` on <{element}>")]
    MissingAttribute { element: &'static str, attr: &'static str },
    #[error("io error loading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, SchemaError>;
