/// Pass/fail tally for `print` statements carrying an `expect:` comment.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TestOracle {
    passed: usize,
    failed: usize,
}

impl TestOracle {
    /// Records one comparison and reports whether it matched.
    pub fn record(&mut self, expected: &str, actual: &str) -> bool {
        let matched = expected == actual;
        if matched {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
        matched
    }

    pub fn passed(&self) -> usize {
        self.passed
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn total(&self) -> usize {
        self.passed + self.failed
    }

    pub fn merge(&mut self, other: &TestOracle) {
        self.passed += other.passed;
        self.failed += other.failed;
    }
}

/// Text after the first `:` of an expect comment, trimmed.
pub fn expected_text(comment: &str) -> &str {
    comment
        .split_once(':')
        .map_or("", |(_, expected)| expected.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_text() {
        assert_eq!(expected_text("// expect: 3"), "3");
        assert_eq!(expected_text("//expect:a1  "), "a1");
        assert_eq!(expected_text("// expect: a: b"), "a: b");
    }

    #[test]
    fn test_record() {
        let mut oracle = TestOracle::default();
        assert!(oracle.record("3", "3"));
        assert!(!oracle.record("3", "4"));
        assert_eq!((oracle.passed(), oracle.failed(), oracle.total()), (1, 1, 2));

        let mut total = TestOracle::default();
        total.merge(&oracle);
        total.merge(&oracle);
        assert_eq!(total.total(), 4);
    }
}
