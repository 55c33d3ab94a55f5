// Copyright (C) 2022 Yehowshua Immanuel
// This program is distributed under both the GPLV3 license
// and the YEHOWSHUA license, both of which can be found at
// the root of the folder containing the sources for this program.
use std::collections::VecDeque;
use std::io;
use std::io::prelude::*;
use std::io::SeekFrom;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line(pub usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Word(pub usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor(pub Line, pub Word);

/// Reads a trace one line at a time, keeping track of where we are.
///
/// Line numbers restart at 1 after [`LineReader::seek_forward`] since the
/// lines that were skipped are never counted.
pub struct LineReader<R> {
    reader: R,
    // the last line as read, terminator included
    buffer: Vec<u8>,
    text: String,
    curr_line: usize,
    byte_pos: u64,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(reader: R) -> LineReader<R> {
        LineReader {
            reader,
            buffer: Vec::new(),
            text: String::new(),
            curr_line: 0,
            byte_pos: 0,
        }
    }

    /// Returns the next line without its terminator, or `None` at the end of
    /// the stream. Bytes that are not valid UTF-8 are replaced rather than
    /// failing the whole run.
    pub fn next_line(&mut self) -> io::Result<Option<(&str, Cursor)>> {
        Ok(self.next_raw_line()?.map(|(text, _, cursor)| (text, cursor)))
    }

    /// Like [`LineReader::next_line`], but also hands back the bytes exactly
    /// as they were read, terminator and all.
    pub fn next_raw_line(&mut self) -> io::Result<Option<(&str, &[u8], Cursor)>> {
        self.buffer.clear();
        let bytes_read = self.reader.read_until(b'\n', &mut self.buffer)?;
        if bytes_read == 0 {
            return Ok(None);
        }

        self.byte_pos += bytes_read as u64;
        self.curr_line += 1;

        let mut end = self.buffer.len();
        while end > 0 && matches!(self.buffer[end - 1], b'\n' | b'\r') {
            end -= 1;
        }
        self.text.clear();
        self.text.push_str(&String::from_utf8_lossy(&self.buffer[..end]));

        Ok(Some((
            self.text.as_str(),
            self.buffer.as_slice(),
            Cursor(Line(self.curr_line), Word(1)),
        )))
    }

    /// Byte offset of the next unread line.
    pub fn byte_pos(&self) -> u64 {
        self.byte_pos
    }

    pub fn cursor(&self) -> Cursor {
        Cursor(Line(self.curr_line), Word(1))
    }
}

impl<R: BufRead + Seek> LineReader<R> {
    /// Jumps forward to the first line boundary at or after `offset`.
    ///
    /// Returns `false` without moving when `offset` is not ahead of the
    /// current position.
    pub fn seek_forward(&mut self, offset: u64) -> io::Result<bool> {
        if offset <= self.byte_pos {
            return Ok(false);
        }

        // Land one byte early so that an offset which already sits on a line
        // boundary only discards the preceding newline.
        self.reader.seek(SeekFrom::Start(offset - 1))?;
        self.buffer.clear();
        let skipped = self.reader.read_until(b'\n', &mut self.buffer)?;

        self.byte_pos = offset - 1 + skipped as u64;
        self.curr_line = 0;
        Ok(true)
    }
}

/// Splits the declaration section into whitespace separated words.
///
/// Declarations may span lines (`$date` usually does) so the header is
/// consumed word by word. Once the header is done, [`WordReader::into_lines`]
/// hands the remaining stream back for line oriented decoding.
pub struct WordReader<R> {
    lines: LineReader<R>,
    words: VecDeque<(String, Cursor)>,
    raw_lines: Option<Vec<Vec<u8>>>,
}

impl<R: BufRead> WordReader<R> {
    pub fn new(reader: R) -> WordReader<R> {
        WordReader {
            lines: LineReader::new(reader),
            words: VecDeque::new(),
            raw_lines: None,
        }
    }

    /// Keep a verbatim copy of every line read so it can be echoed later.
    pub fn keep_raw_lines(mut self) -> WordReader<R> {
        self.raw_lines = Some(Vec::new());
        self
    }

    pub fn next_word(&mut self) -> Result<Option<(String, Cursor)>, Error> {
        while self.words.is_empty() {
            let Some((line, raw, Cursor(line_idx, _))) = self.lines.next_raw_line()? else {
                return Ok(None);
            };

            for (word_idx, word) in line.split_ascii_whitespace().enumerate() {
                let cursor = Cursor(line_idx, Word(word_idx + 1));
                self.words.push_back((word.to_string(), cursor));
            }

            if let Some(raw_lines) = self.raw_lines.as_mut() {
                raw_lines.push(raw.to_vec());
            }
        }

        Ok(self.words.pop_front())
    }

    pub fn cursor(&self) -> Cursor {
        match self.words.front() {
            Some((_, cursor)) => *cursor,
            None => self.lines.cursor(),
        }
    }

    /// Ends word mode. Whatever is left on the current line is dropped.
    pub fn into_lines(self) -> (LineReader<R>, Vec<Vec<u8>>) {
        if !self.words.is_empty() {
            let leftover: Vec<&str> = self.words.iter().map(|(word, _)| word.as_str()).collect();
            tracing::debug!("ignoring {leftover:?} after the end of the declarations");
        }
        (self.lines, self.raw_lines.unwrap_or_default())
    }
}

/// Fetch the next word, treating the end of the stream as a malformed
/// declaration.
macro_rules! next_word {
    ($word_reader:ident) => {
        $word_reader.next_word()?.ok_or_else(|| $crate::error::Error::MalformedRecord {
            line: String::new(),
            cursor: $word_reader.cursor(),
            reason: format!(
                "Error near {}:{}. Reached end of file inside a declaration.",
                file!(),
                line!()
            ),
        })
    };
}
pub(crate) use next_word;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_are_numbered_and_stripped() {
        let mut reader = LineReader::new(io::Cursor::new(b"#0\r\nb1 !\n\nlast".to_vec()));

        let (line, cursor) = reader.next_line().unwrap().unwrap();
        assert_eq!((line, cursor), ("#0", Cursor(Line(1), Word(1))));
        assert_eq!(reader.next_line().unwrap().unwrap().0, "b1 !");
        assert_eq!(reader.next_line().unwrap().unwrap().0, "");
        assert_eq!(reader.next_line().unwrap().unwrap().0, "last");
        assert!(reader.next_line().unwrap().is_none());
        assert_eq!(reader.byte_pos(), 14);
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let mut reader = LineReader::new(io::Cursor::new(b"b1\xff !\n".to_vec()));
        let (line, _) = reader.next_line().unwrap().unwrap();
        assert_eq!(line, "b1\u{fffd} !");
    }

    #[test]
    fn raw_lines_keep_their_bytes() {
        let mut reader = LineReader::new(io::Cursor::new(b"#0\r\nb1\xff !\nlast".to_vec()));

        let (text, raw, _) = reader.next_raw_line().unwrap().unwrap();
        assert_eq!((text, raw), ("#0", &b"#0\r\n"[..]));
        let (text, raw, _) = reader.next_raw_line().unwrap().unwrap();
        assert_eq!((text, raw), ("b1\u{fffd} !", &b"b1\xff !\n"[..]));
        let (text, raw, _) = reader.next_raw_line().unwrap().unwrap();
        assert_eq!((text, raw), ("last", &b"last"[..]));
        assert!(reader.next_raw_line().unwrap().is_none());
    }

    #[test]
    fn seek_lands_on_the_next_line_boundary() {
        let data = b"aaaa\nbbbb\ncccc\n".to_vec();

        // offset in the middle of `bbbb`
        let mut reader = LineReader::new(io::Cursor::new(data.clone()));
        assert!(reader.seek_forward(7).unwrap());
        assert_eq!(reader.next_line().unwrap().unwrap().0, "cccc");

        // offset exactly at the start of `bbbb`
        let mut reader = LineReader::new(io::Cursor::new(data.clone()));
        assert!(reader.seek_forward(5).unwrap());
        let (line, cursor) = reader.next_line().unwrap().unwrap();
        assert_eq!(line, "bbbb");
        assert_eq!(cursor, Cursor(Line(1), Word(1)));

        // never seeks backwards
        let mut reader = LineReader::new(io::Cursor::new(data));
        reader.next_line().unwrap();
        reader.next_line().unwrap();
        assert!(!reader.seek_forward(3).unwrap());
        assert_eq!(reader.next_line().unwrap().unwrap().0, "cccc");
    }

    #[test]
    fn words_span_lines_and_carry_positions() {
        let data = b"$date\r\n  Mon Oct 16\n$end\n#0\n".to_vec();
        let mut words = WordReader::new(io::Cursor::new(data)).keep_raw_lines();

        let mut seen = vec![];
        for _ in 0..5 {
            seen.push(words.next_word().unwrap().unwrap());
        }
        assert_eq!(seen[0], ("$date".to_string(), Cursor(Line(1), Word(1))));
        assert_eq!(seen[3], ("16".to_string(), Cursor(Line(2), Word(3))));
        assert_eq!(seen[4].0, "$end");

        let (mut lines, raw) = words.into_lines();
        assert_eq!(raw, vec![b"$date\r\n".to_vec(), b"  Mon Oct 16\n".to_vec(), b"$end\n".to_vec()]);
        assert_eq!(lines.next_line().unwrap().unwrap().0, "#0");
    }
}
