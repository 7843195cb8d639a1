//! Prefix tree over path tokens, used to find the common root of a file set.

const SEPARATORS: [char; 3] = ['/', '\\', ':'];

#[derive(Debug, Default)]
struct TrieNode {
    token: String,
    children: Vec<TrieNode>,

    /// A whole inserted path ends here.
    terminal: bool,
}

impl TrieNode {
    fn child_mut(&mut self, token: &str) -> &mut TrieNode {
        let pos = match self.children.iter().position(|c| c.token == token) {
            Some(pos) => pos,
            None => {
                self.children.push(TrieNode {
                    token: token.to_string(),
                    ..Default::default()
                });
                self.children.len() - 1
            }
        };
        &mut self.children[pos]
    }
}

#[derive(Debug, Default)]
pub struct PathTrie {
    root: TrieNode,
}

impl PathTrie {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: &str) {
        let mut current = &mut self.root;
        for token in tokenize(path) {
            current = current.child_mut(token);
        }
        current.terminal = true;
    }

    /// Deepest directory shared by every inserted path, separator included.
    pub fn common_root(&self) -> String {
        let mut result = String::new();
        let mut current = &self.root;
        while let [only] = current.children.as_slice() {
            if only.terminal {
                break;
            }
            result.push_str(&only.token);
            current = only;
        }
        match result.rfind(SEPARATORS) {
            Some(pos) => result.truncate(pos + 1),
            None => result.clear(),
        }
        result
    }
}

impl<'a> FromIterator<&'a str> for PathTrie {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut trie = PathTrie::new();
        for path in iter {
            trie.insert(path);
        }
        trie
    }
}

/// Split on separators, keeping each separator as its own token.
pub fn tokenize(path: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut last = 0;
    for (i, c) in path.char_indices() {
        if SEPARATORS.contains(&c) {
            if i > last {
                tokens.push(&path[last..i]);
            }
            tokens.push(&path[i..i + c.len_utf8()]);
            last = i + c.len_utf8();
        }
    }
    if last < path.len() {
        tokens.push(&path[last..]);
    }
    tokens
}

pub fn common_root<'a>(paths: impl IntoIterator<Item = &'a str>) -> String {
    paths.into_iter().collect::<PathTrie>().common_root()
}

/// `path` relative to `root`; relative inputs and paths outside `root` are
/// returned unchanged.
pub fn make_relative(root: &str, path: &str) -> String {
    if root.is_empty() || !is_absolute(path) {
        return path.to_string();
    }
    match path.strip_prefix(root) {
        Some(rest) if !rest.is_empty() => rest.to_string(),
        _ => path.to_string(),
    }
}

/// Absolute in either Unix or Windows notation.
pub fn is_absolute(path: &str) -> bool {
    let bytes = path.as_bytes();
    path.starts_with('/')
        || path.starts_with('\\')
        || (bytes.len() > 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && matches!(bytes[2], b'/' | b'\\'))
}
