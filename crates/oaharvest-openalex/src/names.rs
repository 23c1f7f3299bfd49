//! Local-language names → the English forms OpenAlex indexes

use std::io::{self, BufRead, BufReader};
use std::path::Path;

use pinyin::ToPinyin;
use rustc_hash::FxHashMap;

/// Translates local author/institution names into their canonical
/// English form. Implementations are immutable after construction.
pub trait NameResolver: Send + Sync {
    /// Name to search OpenAlex authors by
    fn resolve_author(&self, name: &str) -> String;

    /// Institution display name expected in OpenAlex affiliations
    fn resolve_institution(&self, name: &str) -> String;
}

/// Resolver backed by a tab-separated institution table
/// (`local<TAB>english` per line) plus pinyin transliteration of
/// Chinese personal names.
#[derive(Debug, Default, Clone)]
pub struct TableResolver {
    institutions: FxHashMap<String, String>,
}

impl TableResolver {
    /// Load the institution table. Blank lines are ignored, lines without
    /// exactly two tab-separated fields are skipped with a warning.
    pub fn from_file(path: &Path) -> io::Result<Self> {
        let file = std::fs::File::open(path)?;
        let mut institutions = FxHashMap::default();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match line.split('\t').collect::<Vec<_>>().as_slice() {
                [local, english] => {
                    institutions.insert(local.trim().to_string(), english.trim().to_string());
                }
                _ => log::warn!("{}:{}: expected 2 fields", path.display(), idx + 1),
            }
        }
        log::debug!(
            "Loaded {} institution names from {}",
            institutions.len(),
            path.display()
        );
        Ok(Self { institutions })
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            institutions: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.institutions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.institutions.is_empty()
    }
}

impl NameResolver for TableResolver {
    fn resolve_author(&self, name: &str) -> String {
        if is_chinese_name(name) {
            transliterate(name)
        } else {
            name.to_string()
        }
    }

    fn resolve_institution(&self, name: &str) -> String {
        match self.institutions.get(name) {
            Some(english) => english.clone(),
            None => {
                log::debug!("No table entry for institution '{name}', using as-is");
                name.to_string()
            }
        }
    }
}

/// Every character is a CJK unified ideograph
pub fn is_chinese_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| ('\u{4e00}'..='\u{9fff}').contains(&c))
}

/// `张三` → `San Zhang`: the first syllable is the family name, the rest
/// are joined into the given name.
pub fn transliterate(name: &str) -> String {
    let syllables: Vec<&str> = name
        .to_pinyin()
        .flatten()
        .map(|p| p.plain())
        .collect();
    match syllables.split_first() {
        Some((family, [])) => capitalize(family),
        Some((family, given)) => format!("{} {}", capitalize(&given.concat()), capitalize(family)),
        None => name.to_string(),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
