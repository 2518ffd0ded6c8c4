use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::io;

/// Reads a text file and returns all its lines as a `Vec<String>`.
///
/// - Reads the entire file into memory
/// - Splits on `\n` / `\r\n`
pub(crate) fn read_file<P: AsRef<Path>>(filename: P) -> io::Result<Vec<String>> {
	let mut contents = String::new();
	File::open(filename)?.read_to_string(&mut contents)?;
	Ok(contents.lines().map(str::to_owned).collect())
}

/// Builds the snapshot path of a corpus for a given chain order.
///
/// Example:
/// `data/chat.jsonl` + order 6 → `data/chat.k6.bin`
pub(crate) fn snapshot_path<P: AsRef<Path>>(corpus: P, order: usize) -> io::Result<PathBuf> {
	let corpus = corpus.as_ref();

	let parent = corpus.parent().unwrap_or_else(|| Path::new("."));
	let file_stem = corpus
		.file_stem()
		.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Corpus path has no filename"))?;

	let mut output = PathBuf::from(parent);
	output.push(format!("{}.k{}.bin", file_stem.to_string_lossy(), order));

	Ok(output)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn snapshot_path_carries_order() {
		let path = snapshot_path("data/chat.jsonl", 6).unwrap();
		assert_eq!(path, PathBuf::from("data/chat.k6.bin"));
	}

	#[test]
	fn snapshot_path_needs_a_filename() {
		assert!(snapshot_path("..", 2).is_err());
	}

	#[test]
	fn read_file_splits_lines() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("lines.txt");
		std::fs::write(&path, "a\r\nb\n\nc").unwrap();
		assert_eq!(read_file(&path).unwrap(), vec!["a", "b", "", "c"]);
	}
}
