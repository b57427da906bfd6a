use common::config::TitleMatch;
use datafusion::functions::expr_fn::lower;
use datafusion::prelude::*;
use std::sync::Arc;

/// Join predicate between an event's song title and a catalog title.
///
/// The pipeline only ever asks for an `Expr`, so a normalising or fuzzy policy
/// can be substituted without touching fact assembly.
pub trait TitleMatcher: Send + Sync {
    fn name(&self) -> &'static str;

    fn predicate(&self, event_song: Expr, catalog_title: Expr) -> Expr;
}

/// Case-sensitive string equality, no normalisation.
pub struct ExactTitle;

impl TitleMatcher for ExactTitle {
    fn name(&self) -> &'static str {
        "exact"
    }

    fn predicate(&self, event_song: Expr, catalog_title: Expr) -> Expr {
        event_song.eq(catalog_title)
    }
}

pub struct CaseInsensitiveTitle;

impl TitleMatcher for CaseInsensitiveTitle {
    fn name(&self) -> &'static str {
        "case_insensitive"
    }

    fn predicate(&self, event_song: Expr, catalog_title: Expr) -> Expr {
        lower(event_song).eq(lower(catalog_title))
    }
}

pub fn matcher_for(policy: TitleMatch) -> Arc<dyn TitleMatcher> {
    match policy {
        TitleMatch::Exact => Arc::new(ExactTitle),
        TitleMatch::CaseInsensitive => Arc::new(CaseInsensitiveTitle),
    }
}
