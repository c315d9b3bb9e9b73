//! Downstream side of the pipeline

use std::io::Write;

use gcodeflow_core::TransportError;

/// Receiver of processed command batches
///
/// A batch is everything one input line turned into. It is handed over in a
/// single call and must not be split or reordered by the caller.
pub trait Transport {
    fn send_batch(&mut self, batch: &[String]) -> Result<(), TransportError>;
}

/// Collects commands in memory
impl Transport for Vec<String> {
    fn send_batch(&mut self, batch: &[String]) -> Result<(), TransportError> {
        self.extend_from_slice(batch);
        Ok(())
    }
}

/// Writes commands as newline-terminated lines to any writer
#[derive(Debug)]
pub struct WriterTransport<W: Write> {
    writer: W,
    lines_written: usize,
}

impl<W: Write> WriterTransport<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            lines_written: 0,
        }
    }

    pub fn lines_written(&self) -> usize {
        self.lines_written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Transport for WriterTransport<W> {
    fn send_batch(&mut self, batch: &[String]) -> Result<(), TransportError> {
        for line in batch {
            self.writer.write_all(line.as_bytes())?;
            self.writer.write_all(b"\n")?;
        }
        self.writer.flush()?;
        self.lines_written += batch.len();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_transport() {
        let mut sink: Vec<String> = Vec::new();
        sink.send_batch(&["G0 X1".to_string(), "G4 P1".to_string()])
            .unwrap();
        assert_eq!(sink, vec!["G0 X1", "G4 P1"]);
    }

    #[test]
    fn test_writer_transport() {
        let mut transport = WriterTransport::new(Vec::new());
        transport.send_batch(&["G0 X1".to_string()]).unwrap();
        transport.send_batch(&[]).unwrap();
        assert_eq!(transport.lines_written(), 1);
        assert_eq!(transport.into_inner(), b"G0 X1\n");
    }
}
