use std::io::BufRead;

use anyhow::Result;

/// Count the lines of a reader.
///
/// A final line without a line terminator is counted as well, like
/// `BufRead::lines` does.
pub fn count_lines(mut buf_read: impl BufRead) -> Result<usize> {
    let mut n_lines = 0;
    let mut last_byte = None;

    loop {
        let buf = buf_read.fill_buf()?;

        if buf.is_empty() {
            break;
        }

        n_lines += bytecount::count(buf, b'\n');
        last_byte = buf.last().copied();

        // Satisfy borrows checker.
        let buf_len = buf.len();
        buf_read.consume(buf_len);
    }

    match last_byte {
        Some(b'\n') | None => Ok(n_lines),
        Some(_) => Ok(n_lines + 1),
    }
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader, Cursor};

    use super::count_lines;

    #[test]
    fn counts_lines() {
        assert_eq!(count_lines(Cursor::new("")).unwrap(), 0);
        assert_eq!(count_lines(Cursor::new("{}\n{}\n")).unwrap(), 2);

        let data = "{}\n".repeat(100);
        let read = BufReader::with_capacity(7, Cursor::new(data));
        assert_eq!(count_lines(read).unwrap(), 100);
    }

    #[test]
    fn counts_final_line_without_terminator() {
        let data = "{}\n{}";
        assert_eq!(count_lines(Cursor::new(data)).unwrap(), 2);
        assert_eq!(Cursor::new(data).lines().count(), 2);

        let read = BufReader::with_capacity(2, Cursor::new("{}\n{}\n{}"));
        assert_eq!(count_lines(read).unwrap(), 3);
    }
}
