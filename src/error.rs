use std::fmt;

#[derive(Debug)]
pub enum WirePostError {
    Generator(String),
    Tsv(csv::Error),
    Io(std::io::Error),
}

impl fmt::Display for WirePostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WirePostError::Generator(message) => {
                write!(f, "diagram generator failed: {}", message)
            }
            WirePostError::Tsv(err) => write!(f, "tsv error: {}", err),
            WirePostError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for WirePostError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WirePostError::Tsv(err) => Some(err),
            WirePostError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for WirePostError {
    fn from(value: std::io::Error) -> Self {
        WirePostError::Io(value)
    }
}

impl From<csv::Error> for WirePostError {
    fn from(value: csv::Error) -> Self {
        WirePostError::Tsv(value)
    }
}
