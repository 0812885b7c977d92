//! `{lo..hi}` range expansion for the `teams` config key (§6, §9).
//!
//! A single template may contain more than one range token; the result is
//! the Cartesian product of all ranges, substituted left to right.

use once_cell::sync::Lazy;
use regex::Regex;

static RANGE_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{(\d+)\.\.(\d+)\}").unwrap());

/// Expands one template string into every concrete value its range tokens
/// describe. A template with no `{lo..hi}` token expands to itself.
pub fn expand_template(template: &str) -> Vec<String> {
    let mut ranges: Vec<(usize, usize, i64, i64)> = Vec::new();
    for m in RANGE_TOKEN.captures_iter(template) {
        let whole = m.get(0).unwrap();
        let lo: i64 = m[1].parse().unwrap();
        let hi: i64 = m[2].parse().unwrap();
        ranges.push((whole.start(), whole.end(), lo, hi));
    }

    if ranges.is_empty() {
        return vec![template.to_string()];
    }

    let mut combos: Vec<Vec<i64>> = vec![vec![]];
    for (_, _, lo, hi) in &ranges {
        let values: Vec<i64> = if lo <= hi {
            (*lo..=*hi).collect()
        } else {
            (*hi..=*lo).rev().collect()
        };
        let mut next = Vec::with_capacity(combos.len() * values.len());
        for combo in &combos {
            for v in &values {
                let mut c = combo.clone();
                c.push(*v);
                next.push(c);
            }
        }
        combos = next;
    }

    combos
        .into_iter()
        .map(|values| substitute(template, &ranges, &values))
        .collect()
}

fn substitute(template: &str, ranges: &[(usize, usize, i64, i64)], values: &[i64]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut cursor = 0;
    for ((start, end, _, _), value) in ranges.iter().zip(values.iter()) {
        out.push_str(&template[cursor..*start]);
        out.push_str(&value.to_string());
        cursor = *end;
    }
    out.push_str(&template[cursor..]);
    out
}

/// Expands the full `teams` config value: a comma- or whitespace-separated
/// list of templates, each independently expanded, concatenated in order.
pub fn expand_teams(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .flat_map(expand_template)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_single_range() {
        assert_eq!(
            expand_template("team-{1..3}.ctf"),
            vec!["team-1.ctf", "team-2.ctf", "team-3.ctf"]
        );
    }

    #[test]
    fn expands_nested_ranges_as_cartesian_product() {
        let mut got = expand_template("{1..2}.{1..2}");
        got.sort();
        let mut want = vec!["1.1", "1.2", "2.1", "2.2"]
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>();
        want.sort();
        assert_eq!(got, want);
    }

    #[test]
    fn template_without_range_is_unchanged() {
        assert_eq!(expand_template("10.0.0.1"), vec!["10.0.0.1"]);
    }

    #[test]
    fn expand_teams_splits_and_concatenates() {
        let teams = expand_teams("team-{1..2}.ctf, 10.0.0.{5..6}");
        assert_eq!(teams.len(), 4);
        assert!(teams.contains(&"team-1.ctf".to_string()));
        assert!(teams.contains(&"10.0.0.6".to_string()));
    }
}
