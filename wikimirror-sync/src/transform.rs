//! Post-copy text modifications on the destination wiki.
//!
//! Each [`ModificationRule`] selects synced titles with its `pages` regex and
//! runs its substitutions in list order, each one over the previous one's
//! output. Counts are summed across rules.

use regex::Regex;

use wikimirror_core::{ContentProvider, ModificationRule, Site, Substitution, Title, TitleSet};

use crate::error::SyncError;
use crate::orchestrator::Phase;
use crate::outcome::{BatchReport, ItemOutcome, SkipReason};

/// Translates a backslash-style replacement (`\1`, `\g<name>`, `\g<1>`, `\n`)
/// into `regex` syntax. A `$` is a literal character and is escaped as `$$`.
pub fn normalize_replacement(repl: &str) -> String {
    let mut out = String::with_capacity(repl.len());
    let mut chars = repl.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '$' => {
                out.push_str("$$");
                continue;
            }
            '\\' => {}
            _ => {
                out.push(c);
                continue;
            }
        }
        match chars.peek().copied() {
            Some(d) if d.is_ascii_digit() => {
                let mut group = String::new();
                while let Some(d) = chars.peek().copied().filter(char::is_ascii_digit) {
                    group.push(d);
                    chars.next();
                }
                out.push_str(&format!("${{{group}}}"));
            }
            Some('g') => {
                chars.next();
                if chars.peek() == Some(&'<') {
                    chars.next();
                    let name: String = chars.by_ref().take_while(|&c| c != '>').collect();
                    out.push_str(&format!("${{{name}}}"));
                } else {
                    out.push_str("\\g");
                }
            }
            Some('n') => {
                chars.next();
                out.push('\n');
            }
            Some('t') => {
                chars.next();
                out.push('\t');
            }
            Some('\\') => {
                chars.next();
                out.push('\\');
            }
            _ => out.push('\\'),
        }
    }
    out
}

fn compile(pattern: &str) -> Result<Regex, SyncError> {
    Regex::new(pattern).map_err(|source| SyncError::Pattern {
        pattern: pattern.to_owned(),
        source,
    })
}

/// A substitution with its pattern compiled (or the compile error, which
/// is reported for every page the rule touches).
struct Prepared {
    pattern: String,
    compiled: Result<Regex, regex::Error>,
    replacement: String,
}

impl Prepared {
    fn new(sub: &Substitution) -> Self {
        Self {
            pattern: sub.pattern.clone(),
            compiled: Regex::new(&sub.pattern),
            replacement: normalize_replacement(&sub.repl),
        }
    }
}

fn run_prepared(text: &str, subs: &[Prepared]) -> Result<String, SyncError> {
    let mut text = text.to_owned();
    for sub in subs {
        let re = sub.compiled.as_ref().map_err(|e| SyncError::Pattern {
            pattern: sub.pattern.clone(),
            source: e.clone(),
        })?;
        text = re.replace_all(&text, sub.replacement.as_str()).into_owned();
    }
    Ok(text)
}

/// Apply `subs` to `text` in order, each over the previous result.
pub fn substitute_all(text: &str, subs: &[Substitution]) -> Result<String, SyncError> {
    let prepared: Vec<Prepared> = subs.iter().map(Prepared::new).collect();
    run_prepared(text, &prepared)
}

/// Compile every pattern of `rule`, reporting the first invalid one.
pub fn validate_rule(rule: &ModificationRule) -> Result<(), SyncError> {
    compile(&rule.page_pattern)?;
    for sub in &rule.substitutions {
        compile(&sub.pattern)?;
    }
    Ok(())
}

/// Titles of `synced` selected by `rule`'s page pattern.
pub fn select(rule: &ModificationRule, synced: &TitleSet) -> Result<TitleSet, SyncError> {
    let selector = compile(&rule.page_pattern)?;
    Ok(synced
        .iter()
        .filter(|title| selector.is_match(title.as_str()))
        .cloned()
        .collect())
}

/// Rewrites synced pages on `dst`.
///
/// In a dry run nothing was copied, so a page missing on `dst` is read from
/// `src` instead: counts then match what a real run would modify.
pub struct TextTransformer<'a, P: ?Sized> {
    provider: &'a P,
    src: &'a Site,
    dst: &'a Site,
    dry_run: bool,
}

impl<'a, P: ContentProvider + ?Sized> TextTransformer<'a, P> {
    pub fn new(provider: &'a P, src: &'a Site, dst: &'a Site) -> Self {
        Self {
            provider,
            src,
            dst,
            dry_run: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Apply every rule to its selection of `synced`; counts are summed
    /// across rules.
    pub fn apply_modifications(&self, synced: &TitleSet, rules: &[ModificationRule]) -> BatchReport {
        let mut report = BatchReport::new(Phase::Modifications);
        for rule in rules {
            report.absorb(self.apply_rule(synced, rule));
        }
        report
    }

    fn apply_rule(&self, synced: &TitleSet, rule: &ModificationRule) -> BatchReport {
        let mut report = BatchReport::new(Phase::Modifications);
        let selected = match select(rule, synced) {
            Ok(selected) => selected,
            Err(err) => {
                tracing::warn!("Skipping modification rule: {err}");
                return report;
            }
        };
        let subs: Vec<Prepared> = rule.substitutions.iter().map(Prepared::new).collect();
        let total = selected.len();
        for (i, title) in selected.iter().enumerate() {
            tracing::info!("{}/{total} Modification of {title}", i + 1);
            let outcome = match self.modify_page(title, &subs) {
                Ok(outcome) => outcome,
                Err(err) => {
                    tracing::warn!("Error to modify page {title} ({err})");
                    ItemOutcome::Failed(err)
                }
            };
            report.record(title, outcome);
        }
        report
    }

    fn modify_page(&self, title: &Title, subs: &[Prepared]) -> Result<ItemOutcome, SyncError> {
        let mut page = self.provider.get_page(self.dst, title)?;
        if !page.exists && self.dry_run {
            page = self.provider.get_page(self.src, title)?;
        }
        if !page.exists {
            return Ok(ItemOutcome::Skipped(SkipReason::NotOnDestination));
        }
        let text = run_prepared(&page.text, subs)?;
        if text == page.text {
            return Ok(ItemOutcome::Skipped(SkipReason::Unchanged));
        }
        if self.dry_run {
            tracing::info!("[dry-run] would save {title}");
            return Ok(ItemOutcome::WouldWrite);
        }
        tracing::info!("Save {title}");
        self.provider
            .write_page(self.dst, title, &text, "Post-synchronization modifications")?;
        Ok(ItemOutcome::Written)
    }
}
