//! Predefined identifiers that are exempt from the uniqueness check.
//!
//! Resource scripts routinely reuse the platform's predefined command and
//! control ids (`IDOK`, `IDC_STATIC`, ...) across many dialogs, so those ids
//! may repeat freely. Which ids count as predefined is a pluggable predicate.

use regex::Regex;
use std::sync::LazyLock;

/// Decides whether a textual id is a reserved system identifier.
pub trait SystemIdentifiers {
    fn is_system_identifier(&self, id: &str) -> bool;
}

impl<F> SystemIdentifiers for F
where
    F: Fn(&str) -> bool,
{
    fn is_system_identifier(&self, id: &str) -> bool {
        self(id)
    }
}

/// Matches nothing; every id takes part in the uniqueness check.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSystemIdentifiers;

impl SystemIdentifiers for NoSystemIdentifiers {
    fn is_system_identifier(&self, _id: &str) -> bool {
        false
    }
}

/// Anchored at the start of the id. `IDC_STATIC` deliberately has no
/// trailing boundary, so `IDC_STATIC_LABEL` is predefined too.
const WINDOWS_PATTERN: &str = r"(?x)
    ^(?:
        IDOK | IDCANCEL | IDC_STATIC | IDYES | IDNO
      | ID_FILE_NEW | ID_FILE_OPEN | ID_FILE_CLOSE | ID_FILE_SAVE
      | ID_FILE_SAVE_AS | ID_FILE_PAGE_SETUP | ID_FILE_PRINT_SETUP
      | ID_FILE_PRINT | ID_FILE_PRINT_DIRECT | ID_FILE_PRINT_PREVIEW
      | ID_FILE_UPDATE | ID_FILE_SAVE_COPY_AS | ID_FILE_SEND_MAIL
      | ID_FILE_MRU_FIRST | ID_FILE_MRU_LAST
      | ID_FILE_MRU_FILE(?:1[0-6]|[1-9])
      | ID_EDIT_CLEAR | ID_EDIT_CLEAR_ALL | ID_EDIT_COPY | ID_EDIT_CUT
      | ID_EDIT_FIND | ID_EDIT_PASTE | ID_EDIT_PASTE_LINK
      | ID_EDIT_PASTE_SPECIAL | ID_EDIT_REPEAT | ID_EDIT_REPLACE
      | ID_EDIT_SELECT_ALL | ID_EDIT_UNDO | ID_EDIT_REDO
      | VS_VERSION_INFO
    )\b
  | ^IDC_STATIC
";

static WINDOWS_SYSTEM_IDENTIFIERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(WINDOWS_PATTERN).expect("system identifier pattern is a valid regex")
});

/// Regex-backed predicate. The default instance recognizes the Windows
/// resource-script predefined ids.
#[derive(Debug, Clone)]
pub struct RegexSystemIdentifiers {
    pattern: Regex,
}

impl RegexSystemIdentifiers {
    /// Build a predicate from a custom pattern. Use `^` to anchor it.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }

    pub fn as_str(&self) -> &str {
        self.pattern.as_str()
    }
}

impl Default for RegexSystemIdentifiers {
    fn default() -> Self {
        Self {
            pattern: WINDOWS_SYSTEM_IDENTIFIERS.clone(),
        }
    }
}

impl SystemIdentifiers for RegexSystemIdentifiers {
    fn is_system_identifier(&self, id: &str) -> bool {
        self.pattern.is_match(id)
    }
}
