use core::fmt;

use crate::Mark;

#[derive(Debug, thiserror::Error)]
pub enum EmitterError {
    #[error("{0}")]
    Problem(&'static str),
    #[error("expected {expected}, but got {found}")]
    UnexpectedEvent {
        expected: &'static str,
        found: &'static str,
    },
    #[error(transparent)]
    Writer(#[from] WriterError),
}

#[derive(Debug, thiserror::Error)]
pub enum WriterError {
    #[error("writer could not flush the entire buffer")]
    Incomplete,
    #[error("no output was set for the emitter")]
    NoOutput,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    #[error("{problem} (#x{value:04X} at byte {offset})")]
    Problem {
        problem: &'static str,
        offset: usize,
        value: u32,
    },
    #[error("invalid byte order mark")]
    InvalidBom,
    #[error("invalid UTF-8 byte #x{value:02X}")]
    InvalidUtf8 { value: u8 },
    #[error("invalid UTF-16 unpaired surrogate #x{value:04X}")]
    InvalidUtf16 { value: u16 },
    #[error("input is too long")]
    TooLong,
    #[error("no input was set")]
    NoInput,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ScannerError {
    #[error("{}", Marked::new(Some(.context), Some(.context_mark), .problem, Some(.problem_mark)))]
    Problem {
        context: &'static str,
        context_mark: Mark,
        problem: &'static str,
        problem_mark: Mark,
    },
    #[error(transparent)]
    Reader(#[from] ReaderError),
}

#[derive(Debug, thiserror::Error)]
pub enum ParserError {
    #[error("no more tokens")]
    UnexpectedEof,
    #[error("{}", Marked::new(None, None, .problem, Some(.mark)))]
    Problem { problem: &'static str, mark: Mark },
    #[error("{}", Marked::new(Some(.context), Some(.context_mark), .problem, Some(.mark)))]
    ProblemWithContext {
        context: &'static str,
        context_mark: Mark,
        problem: &'static str,
        mark: Mark,
    },
    #[error(transparent)]
    Scanner(#[from] ScannerError),
}

/// Any error produced by this crate, classified by the stage that raised it.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Reader(ReaderError),
    #[error(transparent)]
    Scanner(ScannerError),
    #[error(transparent)]
    Parser(ParserError),
    #[error(transparent)]
    Emitter(EmitterError),
}

impl From<ReaderError> for Error {
    fn from(value: ReaderError) -> Self {
        Error::Reader(value)
    }
}

impl From<ScannerError> for Error {
    fn from(value: ScannerError) -> Self {
        match value {
            ScannerError::Reader(err) => Error::Reader(err),
            err @ ScannerError::Problem { .. } => Error::Scanner(err),
        }
    }
}

impl From<ParserError> for Error {
    fn from(value: ParserError) -> Self {
        match value {
            ParserError::Scanner(err) => err.into(),
            err => Error::Parser(err),
        }
    }
}

impl From<EmitterError> for Error {
    fn from(value: EmitterError) -> Self {
        Error::Emitter(value)
    }
}

/// The context/problem rendering shared by scanner and parser errors.
struct Marked<'a> {
    context: Option<&'a str>,
    context_mark: Option<&'a Mark>,
    problem: &'a str,
    problem_mark: Option<&'a Mark>,
}

impl<'a> Marked<'a> {
    fn new(
        context: Option<&'a &'static str>,
        context_mark: Option<&'a Mark>,
        problem: &'a &'static str,
        problem_mark: Option<&'a Mark>,
    ) -> Self {
        Marked {
            context: context.map(|context| &**context),
            context_mark,
            problem,
            problem_mark,
        }
    }
}

impl fmt::Display for Marked<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(context) = self.context {
            writeln!(f, "{context}")?;
        }
        if let Some(context_mark) = self.context_mark {
            let same_position = self.problem_mark.is_some_and(|problem_mark| {
                problem_mark.name == context_mark.name
                    && problem_mark.line == context_mark.line
                    && problem_mark.column == context_mark.column
            });
            if !same_position {
                writeln!(f, "{context_mark}")?;
            }
        }
        write!(f, "{}", self.problem)?;
        if let Some(problem_mark) = self.problem_mark {
            write!(f, "\n{problem_mark}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::sync::Arc;
    use pretty_assertions::assert_eq;

    fn mark(line: u64, column: u64) -> Mark {
        Mark::new(Arc::from("<test>"), 0, line, column)
    }

    #[test]
    fn scanner_error_with_distinct_marks() {
        let err = ScannerError::Problem {
            context: "while scanning a quoted scalar",
            context_mark: mark(0, 0),
            problem: "found unexpected end of stream",
            problem_mark: mark(0, 4),
        };
        assert_eq!(
            err.to_string(),
            "while scanning a quoted scalar\n  in \"<test>\", line 1, column 1\nfound unexpected end of stream\n  in \"<test>\", line 1, column 5"
        );
    }

    #[test]
    fn context_mark_omitted_when_equal() {
        let err = ParserError::ProblemWithContext {
            context: "while parsing a block mapping",
            context_mark: mark(2, 3),
            problem: "did not find expected key",
            mark: mark(2, 3),
        };
        assert_eq!(
            err.to_string(),
            "while parsing a block mapping\ndid not find expected key\n  in \"<test>\", line 3, column 4"
        );
    }

    #[test]
    fn umbrella_error_names_origin() {
        let reader = ParserError::Scanner(ScannerError::Reader(ReaderError::InvalidBom));
        assert!(matches!(Error::from(reader), Error::Reader(_)));

        let scanner = ParserError::Scanner(ScannerError::Problem {
            context: "while scanning an anchor",
            context_mark: mark(0, 0),
            problem: "did not find expected alphabetic or numeric character",
            problem_mark: mark(0, 1),
        });
        assert!(matches!(Error::from(scanner), Error::Scanner(_)));

        let parser = ParserError::UnexpectedEof;
        assert!(matches!(Error::from(parser), Error::Parser(_)));
    }
}
