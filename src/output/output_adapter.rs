use std::{fmt, io};

/// Adapts an [`io::Write`] (like stdout) so the HTML writers, which work against [`fmt::Write`], can write to it.
pub fn io_to_fmt(writer: impl io::Write) -> impl fmt::Write {
    Adapter(writer)
}

struct Adapter<W>(W);

impl<W: io::Write> fmt::Write for Adapter<W> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0.write_all(s.as_bytes()).map_err(|_| fmt::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write;

    #[test]
    fn writes_through() {
        let mut bytes = Vec::new();
        {
            let mut out = io_to_fmt(&mut bytes);
            write!(out, "<b>{}</b>", "é").unwrap();
        }
        assert_eq!(String::from_utf8(bytes).unwrap(), "<b>é</b>");
    }
}
