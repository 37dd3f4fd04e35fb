use std::fs;
use std::path::Path;

use crate::error::{DriverError, DriverResult};

/// Reads an RTSI recipe file: one variable name per line, blank lines
/// preserved. A missing file or a file with no content at all is a
/// construction-time failure, not an empty recipe.
pub fn read_recipe_lines(path: &Path) -> DriverResult<Vec<String>> {
    let text = fs::read_to_string(path).map_err(|source| DriverError::FileOpenFail { path: path.to_owned(), source })?;
    if text.is_empty() {
        return Err(DriverError::FileOpenFail { path: path.to_owned(), source: std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "recipe file is empty") });
    }
    Ok(text.lines().map(str::to_owned).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_one_variable_per_line() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "actual_joint_positions").unwrap();
        writeln!(file, "actual_TCP_pose").unwrap();
        let lines = read_recipe_lines(file.path()).unwrap();
        assert_eq!(lines, vec!["actual_joint_positions", "actual_TCP_pose"]);
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = read_recipe_lines(Path::new("/no/such/recipe.txt")).unwrap_err();
        assert!(matches!(err, DriverError::FileOpenFail { .. }));
    }

    #[test]
    fn empty_file_is_an_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = read_recipe_lines(file.path()).unwrap_err();
        assert!(matches!(err, DriverError::FileOpenFail { .. }));
    }
}
