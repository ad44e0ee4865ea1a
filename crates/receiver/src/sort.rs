//! 자연 정렬 -- 숫자를 인식하는 파일 이름 비교
//!
//! 숫자 구간은 수치로, 나머지는 대소문자 구분 없이 문자 단위로 비교합니다.
//! 한쪽이 다른 쪽의 접두어이면 짧은 쪽이 먼저입니다.
//!
//! ```
//! use logtide_receiver::sort::natural_sort;
//!
//! let mut names = vec!["log.10", "log.2", "log.1", "log"];
//! natural_sort(&mut names);
//! assert_eq!(names, ["log", "log.1", "log.2", "log.10"]);
//! ```

use std::cmp::Ordering;
use std::iter::Peekable;
use std::path::Path;
use std::str::Chars;

/// 두 문자열을 자연 순서로 비교합니다.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();

    loop {
        match (left.peek().copied(), right.peek().copied()) {
            // 자연 순서로 같으면 원문 비교로 전순서를 유지
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) if l.is_ascii_digit() && r.is_ascii_digit() => {
                let l_run = take_digits(&mut left);
                let r_run = take_digits(&mut right);
                match compare_digit_runs(&l_run, &r_run) {
                    Ordering::Equal => {}
                    other => return other,
                }
            }
            (Some(l), Some(r)) => {
                match l.to_lowercase().cmp(r.to_lowercase()) {
                    Ordering::Equal => {}
                    other => return other,
                }
                left.next();
                right.next();
            }
        }
    }
}

/// 경로의 파일 이름 기준으로 자연 정렬합니다.
pub fn natural_sort<P: AsRef<Path>>(paths: &mut [P]) {
    paths.sort_by(|a, b| {
        let a = file_name_lossy(a.as_ref());
        let b = file_name_lossy(b.as_ref());
        natural_cmp(&a, &b)
    });
}

fn file_name_lossy(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

fn take_digits(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(&c) = chars.peek() {
        if !c.is_ascii_digit() {
            break;
        }
        run.push(c);
        chars.next();
    }
    run
}

/// 숫자 구간 비교: 앞의 0을 무시한 자릿수, 값, 0의 개수 순
fn compare_digit_runs(a: &str, b: &str) -> Ordering {
    let a_trimmed = a.trim_start_matches('0');
    let b_trimmed = b.trim_start_matches('0');

    a_trimmed
        .len()
        .cmp(&b_trimmed.len())
        .then_with(|| a_trimmed.cmp(b_trimmed))
        .then_with(|| a.len().cmp(&b.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn rotated_logs_sort_numerically() {
        let mut names = vec!["log.10", "log.2", "log.1", "log"];
        natural_sort(&mut names);
        assert_eq!(names, ["log", "log.1", "log.2", "log.10"]);
    }

    #[test]
    fn case_insensitive_text() {
        assert_eq!(natural_cmp("App.log", "app.log.1"), Ordering::Less);
        assert_eq!(natural_cmp("b", "A"), Ordering::Greater);
    }

    #[test]
    fn leading_zeros() {
        assert_eq!(natural_cmp("file007", "file7"), Ordering::Greater);
        assert_eq!(natural_cmp("file007", "file8"), Ordering::Less);
    }

    #[test]
    fn large_numbers_do_not_overflow() {
        assert_eq!(
            natural_cmp("log.99999999999999999999999", "log.100000000000000000000000"),
            Ordering::Less
        );
    }

    #[test]
    fn sort_uses_file_name_only() {
        let mut paths = vec![
            PathBuf::from("/z/app.log.2"),
            PathBuf::from("/a/app.log.10"),
            PathBuf::from("/m/app.log"),
        ];
        natural_sort(&mut paths);
        assert_eq!(
            paths,
            [
                PathBuf::from("/m/app.log"),
                PathBuf::from("/z/app.log.2"),
                PathBuf::from("/a/app.log.10"),
            ]
        );
    }

    #[test]
    fn date_stamped_names() {
        let mut names = vec!["trace-2024-01-10.log", "trace-2024-01-9.log", "trace.log"];
        natural_sort(&mut names);
        assert_eq!(
            names,
            ["trace-2024-01-9.log", "trace-2024-01-10.log", "trace.log"]
        );
    }
}
