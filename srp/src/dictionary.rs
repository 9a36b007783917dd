use failure::Error;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

pub type Words<'a> = Box<dyn Iterator<Item = Result<Vec<u8>, Error>> + 'a>;

/// A finite source of candidate passwords. Every call to `words` starts over
/// from the first candidate.
pub trait Dictionary: Sync {
    fn words(&self) -> Result<Words<'_>, Error>;
}

pub struct WordList {
    words: Vec<Vec<u8>>,
}

impl WordList {
    pub fn new<I, W>(words: I) -> Self
    where
        I: IntoIterator<Item = W>,
        W: AsRef<[u8]>,
    {
        WordList {
            words: words.into_iter().map(|w| w.as_ref().to_vec()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl Dictionary for WordList {
    fn words(&self) -> Result<Words<'_>, Error> {
        Ok(Box::new(self.words.iter().map(|w| Ok(w.clone()))))
    }
}

/// One candidate per line. Surrounding whitespace is stripped and blank
/// lines are skipped.
pub struct WordFile {
    path: PathBuf,
}

impl WordFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        WordFile {
            path: path.as_ref().to_path_buf(),
        }
    }
}

fn trim(line: &[u8]) -> &[u8] {
    let start = line
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(line.len());
    let end = line
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &line[start..end]
}

impl Dictionary for WordFile {
    fn words(&self) -> Result<Words<'_>, Error> {
        let reader = BufReader::new(File::open(&self.path)?);
        let words = reader
            .split(b'\n')
            .map(|line| -> Result<Vec<u8>, Error> { Ok(trim(&line?).to_vec()) })
            .filter(|word| word.as_ref().map_or(true, |w| !w.is_empty()));
        Ok(Box::new(words))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn collect<D: Dictionary>(dictionary: &D) -> Vec<Vec<u8>> {
        dictionary
            .words()
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn trims_whitespace() {
        assert_eq!(trim(b"  word\r"), b"word");
        assert_eq!(trim(b"word"), b"word");
        assert_eq!(trim(b" \t "), b"");
        assert_eq!(trim(b""), b"");
    }

    #[test]
    fn word_list_restarts() {
        let list = WordList::new(&["alpha", "beta"]);
        assert_eq!(list.len(), 2);
        assert_eq!(collect(&list), collect(&list));
        assert_eq!(collect(&list), vec![b"alpha".to_vec(), b"beta".to_vec()]);
    }

    #[test]
    fn word_file_reads_lines() {
        let path = std::env::temp_dir().join(format!("srp-words-{}.txt", std::process::id()));
        {
            let mut file = File::create(&path).unwrap();
            file.write_all(b"alpha\r\n\n  beta \ngamma").unwrap();
        }
        let dictionary = WordFile::new(&path);
        let expected = vec![b"alpha".to_vec(), b"beta".to_vec(), b"gamma".to_vec()];
        assert_eq!(collect(&dictionary), expected);
        assert_eq!(collect(&dictionary), expected);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn missing_word_file() {
        assert!(WordFile::new("/nonexistent/words.txt").words().is_err());
    }
}
