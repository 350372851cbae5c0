use std::io::{ErrorKind, Write};

use crate::{Emitter, Encoding, WriterError};

impl Emitter<'_> {
    /// Flush the accumulated characters to the output.
    pub(crate) fn flush_buffer(&mut self) -> Result<(), WriterError> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let Some(handler) = self.write_handler.as_mut() else {
            return Err(WriterError::NoOutput);
        };

        let big_endian = match self.encoding {
            Encoding::Any | Encoding::Utf8 => {
                write_all(&mut **handler, self.buffer.as_bytes())?;
                self.buffer.clear();
                return Ok(());
            }
            Encoding::Utf16Le => false,
            Encoding::Utf16Be => true,
        };

        for ch in self.buffer.encode_utf16() {
            let bytes = if big_endian {
                ch.to_be_bytes()
            } else {
                ch.to_le_bytes()
            };
            self.raw_buffer.extend(bytes);
        }

        write_all(&mut **handler, &self.raw_buffer)?;
        self.buffer.clear();
        self.raw_buffer.clear();
        Ok(())
    }
}

fn write_all(handler: &mut dyn Write, bytes: &[u8]) -> Result<(), WriterError> {
    match handler.write_all(bytes) {
        Err(error) if error.kind() == ErrorKind::WriteZero => Err(WriterError::Incomplete),
        result => Ok(result?),
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use crate::{EmitterError, Event, ImplicitLevel, ScalarStyle};

    use super::*;

    /// Accepts a fixed number of bytes, then refuses to take more.
    struct Full(usize);

    impl Write for Full {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let accepted = buf.len().min(self.0);
            self.0 -= accepted;
            Ok(accepted)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn emit_document(emitter: &mut Emitter) -> Result<(), EmitterError> {
        emitter.emit(Event::stream_start(Encoding::Any))?;
        emitter.emit(Event::document_start(None, &[], true))?;
        emitter.emit(Event::scalar(
            None,
            None,
            "\u{e9}",
            ImplicitLevel::Plain,
            ScalarStyle::Any,
        ))?;
        emitter.emit(Event::document_end(true))?;
        emitter.emit(Event::stream_end())
    }

    #[test]
    fn utf16_big_endian() {
        let mut output = Vec::new();
        {
            let mut emitter = Emitter::new();
            emitter.set_output(&mut output);
            emitter.set_encoding(Encoding::Utf16Be);
            emitter.set_unicode(true);
            emit_document(&mut emitter).unwrap();
        }
        assert_eq!(output, [0xFE, 0xFF, 0x00, 0xE9, 0x00, b'\n']);
    }

    #[test]
    fn short_writes_are_reported() {
        let mut output = Full(1);
        let mut emitter = Emitter::new();
        emitter.set_output(&mut output);
        emitter.set_unicode(true);
        let error = emit_document(&mut emitter).unwrap_err();
        assert!(matches!(
            error,
            EmitterError::Writer(WriterError::Incomplete)
        ));
    }
}
