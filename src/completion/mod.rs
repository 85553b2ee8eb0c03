use tower_lsp::lsp_types::{CompletionItem, CompletionList, CompletionResponse, Position, Url};

use crate::{config::Settings, documents::TrackedDocument, index::WikilinkIndex, scanner::FileSet};

use self::wikilink_completer::WikilinkCompleter;

mod context;
mod wikilink_completer;

pub use context::WikilinkContext;

#[derive(Clone, Copy)]
pub struct Context<'a> {
    pub files: &'a FileSet,
    pub index: &'a WikilinkIndex,
    pub uri: &'a Url,
    pub document: &'a TrackedDocument,
    pub settings: &'a Settings,
}

pub trait Completer<'a>: Sized {
    fn construct(context: Context<'a>, line: usize, character: usize) -> Option<Self>;

    fn completions(&self) -> Vec<CompletionItem>;
}

pub fn get_completions(context: Context, position: Position) -> Option<CompletionResponse> {
    run_completer::<WikilinkCompleter>(context, position.line, position.character)
}

fn run_completer<'a, T: Completer<'a>>(
    context: Context<'a>,
    line: u32,
    character: u32,
) -> Option<CompletionResponse> {
    let completer = T::construct(context, line as usize, character as usize)?;

    Some(CompletionResponse::List(CompletionList {
        is_incomplete: true,
        items: completer.completions(),
    }))
}
