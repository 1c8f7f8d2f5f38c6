//! Reads an .sql file that contains our integration tests.
//!
//! These files contain multiple tests that look like this:
//! ```sql
//! --       v_____________________v--- this is the input
//! -- Test: MOSTRAR nome DE pessoas
//! SELECT nome
//! FROM pessoas
//! WHERE pessoas.tenant_id = 'T1'
//! ```
//! All tests start with "-- Test:" followed by the input query on the same line. The next lines
//! until a blank line are the expected output.
//!
//! Tests that should fail have a single "-- Error: <message>" line as their expected output,
//! the message being the one line summary of the error.
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::iter::Enumerate;
use std::path::PathBuf;

const TEST_PREFIX: &str = "-- Test: ";
const ERROR_PREFIX: &str = "-- Error: ";

pub struct SqlTestFileReader {
    lines: Enumerate<Lines<BufReader<File>>>,
}

/// One of our integration tests.
pub struct Test {
    pub line_nr: usize,
    pub input: String,
    pub expected: Expectation,
}

pub enum Expectation {
    Sql(String),
    Error(String),
}

impl Iterator for SqlTestFileReader {
    type Item = Result<Test, crate::error::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((line_nr, line_res)) = self.lines.next() {
            match line_res {
                Ok(line) => {
                    if let Some(input) = line.strip_prefix(TEST_PREFIX) {
                        return Some(self.create_test(line_nr, input.to_string()));
                    }
                    // Any line not in a -- Test: block is ignored.
                }
                Err(err) => {
                    return Some(Err(err.into()));
                }
            }
        }

        None
    }
}

impl SqlTestFileReader {
    pub fn new(file_path: PathBuf) -> Result<Self, crate::error::Error> {
        let file = File::open(file_path)?;
        let reader = BufReader::new(file);

        Ok(SqlTestFileReader {
            lines: reader.lines().enumerate(),
        })
    }

    fn create_test(&mut self, line_nr: usize, input: String) -> Result<Test, crate::error::Error> {
        let mut content = Vec::new();

        for (_, line_res) in self.lines.by_ref() {
            let line = line_res?;

            if line.trim().is_empty() {
                // Empty line => end of test
                break;
            }

            content.push(line);
        }

        let expected = match content.as_slice() {
            [single] if single.starts_with(ERROR_PREFIX) => {
                Expectation::Error(single[ERROR_PREFIX.len()..].to_string())
            }
            _ => Expectation::Sql(content.join("\n")),
        };

        Ok(Test {
            line_nr: line_nr + 1, // they don't start at 0
            input,
            expected,
        })
    }
}
