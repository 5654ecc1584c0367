use std::backtrace::Backtrace;
use std::error::Error;
use std::fmt;

use edne::error::ImportError;

/// Returns whether terminal output should include backtraces.
fn should_render_backtrace() -> bool {
    matches!(
        std::env::var("RUST_BACKTRACE").as_deref(),
        Ok("1") | Ok("full")
    )
}

pub type ImporterResult<T> = Result<T, ImporterError>;

/// Captured backtrace wrapper to avoid thiserror's unstable feature detection.
pub struct CapturedBacktrace(Backtrace);

impl CapturedBacktrace {
    fn capture() -> Self {
        Self(Backtrace::capture())
    }
}

impl fmt::Debug for CapturedBacktrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error type of the importer binary.
///
/// Wraps [`ImportError`] for failures of the import itself and adds variants for the setup
/// around it.
#[derive(Debug)]
pub enum ImporterError {
    Import(ImportError),
    Config(Box<dyn Error + Send + Sync>, CapturedBacktrace),
    Io(std::io::Error, CapturedBacktrace),
}

impl ImporterError {
    /// Returns a short category label for this error.
    pub fn category(&self) -> &'static str {
        match self {
            ImporterError::Import(_) => "import error",
            ImporterError::Config(_, _) => "configuration error",
            ImporterError::Io(_, _) => "i/o error",
        }
    }

    pub fn backtrace(&self) -> Option<&Backtrace> {
        match self {
            ImporterError::Import(err) => err.backtrace(),
            ImporterError::Config(_, cb) => Some(&cb.0),
            ImporterError::Io(_, cb) => Some(&cb.0),
        }
    }

    pub fn config<E: Error + Send + Sync + 'static>(err: E) -> Self {
        ImporterError::Config(Box::new(err), CapturedBacktrace::capture())
    }

    /// Returns a user-oriented report for terminal output.
    pub fn render_report(&self) -> String {
        let mut out = String::new();
        out.push_str("import failed\n");
        out.push_str(&format!("category: {}\n", self.category()));
        out.push_str(&format!("error: {}\n", self));

        // Aggregated import errors already print every inner error.
        if !matches!(self, ImporterError::Import(err) if err.error_count() > 1) {
            let mut source = Error::source(self);
            let mut idx = 1usize;
            while let Some(err) = source {
                out.push_str(&format!("cause {idx}: {err}\n"));
                source = err.source();
                idx += 1;
            }
        }

        if should_render_backtrace()
            && let Some(backtrace) = self.backtrace()
        {
            out.push_str("backtrace:\n");
            out.push_str(&backtrace.to_string());
            if !out.ends_with('\n') {
                out.push('\n');
            }
        }

        out
    }
}

impl fmt::Display for ImporterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImporterError::Import(err) => write!(f, "{err}"),
            ImporterError::Config(source, _) => write!(f, "configuration error: {source}"),
            ImporterError::Io(source, _) => write!(f, "i/o error: {source}"),
        }
    }
}

impl Error for ImporterError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ImporterError::Import(err) => err.source(),
            ImporterError::Config(source, _) => Some(source.as_ref()),
            ImporterError::Io(source, _) => Some(source),
        }
    }
}

impl From<std::io::Error> for ImporterError {
    fn from(err: std::io::Error) -> Self {
        ImporterError::Io(err, CapturedBacktrace::capture())
    }
}

impl From<ImportError> for ImporterError {
    fn from(err: ImportError) -> Self {
        ImporterError::Import(err)
    }
}
