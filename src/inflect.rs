//! English inflection for entity names.
//!
//! Entity names arrive CamelCased (`BlogPosts`) or snake_cased (`blog_posts`).
//! Only the last word is inflected, so compound names keep their prefix.

use once_cell::sync::Lazy;
use regex::Regex;

const UNCOUNTABLE: &[&str] = &[
    "equipment",
    "information",
    "rice",
    "money",
    "species",
    "series",
    "fish",
    "sheep",
    "jeans",
    "police",
    "news",
];

// (singular, plural)
const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("man", "men"),
    ("woman", "women"),
    ("child", "children"),
    ("sex", "sexes"),
    ("move", "moves"),
    ("zombie", "zombies"),
];

fn compile(rules: &[(&str, &'static str)]) -> Vec<(Regex, &'static str)> {
    rules
        .iter()
        .map(|(pattern, replacement)| {
            let regex = Regex::new(&format!("(?i){pattern}")).expect("inflection rule");
            (regex, *replacement)
        })
        .collect()
}

// First match wins.
static PLURAL: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    compile(&[
        ("(quiz)$", "${1}zes"),
        ("^(oxen)$", "${1}"),
        ("^(ox)$", "${1}en"),
        ("([ml])ice$", "${1}ice"),
        ("([ml])ouse$", "${1}ice"),
        ("(matr|vert|ind)(?:ix|ex)$", "${1}ices"),
        ("(x|ch|ss|sh)$", "${1}es"),
        ("([^aeiouy]|qu)y$", "${1}ies"),
        ("(hive)$", "${1}s"),
        ("([lr])f$", "${1}ves"),
        ("([^f])fe$", "${1}ves"),
        ("sis$", "ses"),
        ("([ti])a$", "${1}a"),
        ("([ti])um$", "${1}a"),
        ("(buffal|tomat)o$", "${1}oes"),
        ("(bu)s$", "${1}ses"),
        ("(alias|status)$", "${1}es"),
        ("(octop|vir)i$", "${1}i"),
        ("(octop|vir)us$", "${1}i"),
        ("^(ax|test)is$", "${1}es"),
        ("s$", "s"),
        ("$", "s"),
    ])
});

static SINGULAR: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    compile(&[
        ("(database)s$", "${1}"),
        ("(quiz)zes$", "${1}"),
        ("(matr)ices$", "${1}ix"),
        ("(vert|ind)ices$", "${1}ex"),
        ("^(ox)en", "${1}"),
        ("(alias|status)(?:es)?$", "${1}"),
        ("(octop|vir)(?:us|i)$", "${1}us"),
        ("^(a)x[ie]s$", "${1}xis"),
        ("(cris|test)(?:is|es)$", "${1}is"),
        ("(shoe)s$", "${1}"),
        ("(o)es$", "${1}"),
        ("(bus)(?:es)?$", "${1}"),
        ("([ml])ice$", "${1}ouse"),
        ("(x|ch|ss|sh)es$", "${1}"),
        ("(m)ovies$", "${1}ovie"),
        ("([^aeiouy]|qu)ies$", "${1}y"),
        ("([lr])ves$", "${1}f"),
        ("(tive)s$", "${1}"),
        ("(hive)s$", "${1}"),
        ("([^f])ves$", "${1}fe"),
        (
            "((a)naly|(b)a|(d)iagno|(p)arenthe|(p)rogno|(s)ynop|(t)he)(?:sis|ses)$",
            "${1}sis",
        ),
        ("([ti])a$", "${1}um"),
        ("(ss)$", "${1}"),
        ("s$", ""),
    ])
});

/// Split `word` into (prefix, last word).
fn split_last_word(word: &str) -> (&str, &str) {
    let chars: Vec<(usize, char)> = word.char_indices().collect();
    let mut start = 0;
    for (pos, &(i, c)) in chars.iter().enumerate() {
        if c == '_' {
            start = i + c.len_utf8();
            continue;
        }
        if pos == 0 || !c.is_uppercase() {
            continue;
        }
        let prev = chars[pos - 1].1;
        let next = chars.get(pos + 1).map(|&(_, n)| n);
        let boundary = prev.is_lowercase()
            || prev.is_ascii_digit()
            || (prev.is_uppercase() && next.is_some_and(char::is_lowercase));
        if boundary {
            start = i;
        }
    }
    word.split_at(start)
}

fn match_case(template: &str, replacement: &str) -> String {
    let mut out = String::with_capacity(replacement.len());
    let upper = template.chars().next().is_some_and(char::is_uppercase);
    let mut chars = replacement.chars();
    if let Some(first) = chars.next() {
        if upper {
            out.extend(first.to_uppercase());
        } else {
            out.push(first);
        }
    }
    out.extend(chars);
    out
}

fn inflect(word: &str, rules: &[(Regex, &'static str)], plural: bool) -> String {
    let (prefix, last) = split_last_word(word);
    if last.is_empty() {
        return word.to_string();
    }

    let lower = last.to_lowercase();
    if UNCOUNTABLE.contains(&lower.as_str()) {
        return word.to_string();
    }

    for &(singular, plural_form) in IRREGULAR {
        let (from, to) = if plural {
            (singular, plural_form)
        } else {
            (plural_form, singular)
        };
        if lower == to {
            return word.to_string();
        }
        if lower == from {
            return format!("{prefix}{}", match_case(last, to));
        }
    }

    for (regex, replacement) in rules {
        if regex.is_match(last) {
            return format!("{prefix}{}", regex.replace(last, *replacement));
        }
    }
    word.to_string()
}

pub fn pluralize(word: &str) -> String {
    inflect(word, &PLURAL, true)
}

pub fn singularize(word: &str) -> String {
    inflect(word, &SINGULAR, false)
}

/// True when `word` is already in plural form.
pub fn is_plural(word: &str) -> bool {
    pluralize(word) == word
}

pub fn is_singular(word: &str) -> bool {
    singularize(word) == word
}

static ACRONYM_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Z\d]+)([A-Z][a-z])").expect("underscore rule"));
static WORD_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z\d])([A-Z])").expect("underscore rule"));

/// `EmailAddress` -> `email_address`, `HTTPCode` -> `http_code`.
pub fn underscore(word: &str) -> String {
    let word = ACRONYM_BOUNDARY.replace_all(word, "${1}_${2}");
    let word = WORD_BOUNDARY.replace_all(&word, "${1}_${2}");
    word.replace('-', "_").to_lowercase()
}

/// `blog_posts` -> `BlogPosts`.
pub fn camelize(word: &str) -> String {
    word.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize("User"), "Users");
        assert_eq!(pluralize("Users"), "Users");
        assert_eq!(pluralize("Category"), "Categories");
        assert_eq!(pluralize("Status"), "Statuses");
        assert_eq!(pluralize("Person"), "People");
        assert_eq!(pluralize("BlogPost"), "BlogPosts");
        assert_eq!(pluralize("SalesPerson"), "SalesPeople");
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(pluralize("sheep"), "sheep");
    }

    #[test]
    fn test_singularize() {
        assert_eq!(singularize("Users"), "User");
        assert_eq!(singularize("User"), "User");
        assert_eq!(singularize("Categories"), "Category");
        assert_eq!(singularize("Statuses"), "Status");
        assert_eq!(singularize("People"), "Person");
        assert_eq!(singularize("BlogPosts"), "BlogPost");
        assert_eq!(singularize("addresses"), "address");
        assert_eq!(singularize("comments"), "comment");
    }

    #[test]
    fn test_plurality() {
        assert!(is_plural("Users"));
        assert!(!is_plural("User"));
        assert!(is_plural("People"));
        assert!(!is_plural("Status"));
        assert!(is_singular("Post"));
        assert!(!is_singular("Posts"));
    }

    #[test]
    fn test_underscore() {
        assert_eq!(underscore("Email"), "email");
        assert_eq!(underscore("EmailAddress"), "email_address");
        assert_eq!(underscore("HTTPCode"), "http_code");
        assert_eq!(underscore("UserByEmail"), "user_by_email");
        assert_eq!(underscore("Post2Tag"), "post2_tag");
    }

    #[test]
    fn test_camelize() {
        assert_eq!(camelize("blog_posts"), "BlogPosts");
        assert_eq!(camelize("user"), "User");
        assert_eq!(camelize("users"), "Users");
    }
}
