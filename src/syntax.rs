//! Fence language tags for markdown code blocks.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::Path;

/// Tag used when neither the file name nor the extension is known.
pub const DEFAULT_TAG: &str = "text";

/// Bare file names that carry their own type, checked before extensions.
static FILENAME_TAGS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("Makefile", "make"),
        ("makefile", "make"),
        ("GNUmakefile", "make"),
        ("CMakeLists.txt", "cmake"),
        ("Cargo.toml", "toml"),
        ("Cargo.lock", "toml"),
        ("Dockerfile", "dockerfile"),
        ("Containerfile", "dockerfile"),
        ("Gemfile", "ruby"),
        ("Rakefile", "ruby"),
        ("Jenkinsfile", "groovy"),
        ("Vagrantfile", "ruby"),
        ("apache.conf", "apacheconf"),
        ("apache2.conf", "apacheconf"),
        ("squid.conf", "squidconf"),
        ("sources.list", "sourceslist"),
        (".htaccess", "apacheconf"),
        (".gitignore", "gitignore"),
        (".dockerignore", "gitignore"),
        (".vimrc", "vim"),
        (".bashrc", "bash"),
        (".zshrc", "zsh"),
    ]
    .into_iter()
    .collect()
});

/// Lower-cased extensions (without the dot) to fence tags.
static EXTENSION_TAGS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        // Scripting
        ("py", "python"),
        ("pyw", "python"),
        ("pyi", "python"),
        ("pyx", "cython"),
        ("pxd", "cython"),
        ("rb", "ruby"),
        ("rake", "ruby"),
        ("gemspec", "ruby"),
        ("pl", "perl"),
        ("pm", "perl"),
        ("php", "php"),
        ("lua", "lua"),
        ("tcl", "tcl"),
        ("r", "r"),
        ("ps1", "powershell"),
        ("psm1", "powershell"),
        ("sh", "shell"),
        ("bash", "bash"),
        ("ksh", "bash"),
        ("zsh", "zsh"),
        ("fish", "fish"),
        ("csh", "tcsh"),
        ("tcsh", "tcsh"),
        ("bat", "batch"),
        ("cmd", "batch"),
        ("vbs", "vbscript"),
        ("vim", "vim"),
        // Web
        ("js", "javascript"),
        ("mjs", "javascript"),
        ("cjs", "javascript"),
        ("jsx", "jsx"),
        ("ts", "typescript"),
        ("tsx", "tsx"),
        ("html", "html"),
        ("htm", "html"),
        ("xhtml", "html"),
        ("css", "css"),
        ("scss", "scss"),
        ("sass", "sass"),
        ("less", "less"),
        ("vue", "vue"),
        ("svelte", "svelte"),
        ("erb", "erb"),
        ("haml", "haml"),
        ("jsp", "jsp"),
        // Systems
        ("rs", "rust"),
        ("c", "c"),
        ("h", "c"),
        ("cpp", "cpp"),
        ("cc", "cpp"),
        ("cxx", "cpp"),
        ("c++", "cpp"),
        ("hpp", "cpp"),
        ("hh", "cpp"),
        ("hxx", "cpp"),
        ("h++", "cpp"),
        ("go", "go"),
        ("zig", "zig"),
        ("d", "d"),
        ("asm", "nasm"),
        ("s", "gas"),
        ("ll", "llvm"),
        // JVM / .NET
        ("java", "java"),
        ("kt", "kotlin"),
        ("kts", "kotlin"),
        ("scala", "scala"),
        ("groovy", "groovy"),
        ("gradle", "groovy"),
        ("clj", "clojure"),
        ("cljs", "clojure"),
        ("cs", "csharp"),
        ("fs", "fsharp"),
        ("vb", "vbnet"),
        // Functional and others
        ("hs", "haskell"),
        ("lhs", "lhs"),
        ("ml", "ocaml"),
        ("mli", "ocaml"),
        ("erl", "erlang"),
        ("hrl", "erlang"),
        ("ex", "elixir"),
        ("exs", "elixir"),
        ("el", "elisp"),
        ("lisp", "lisp"),
        ("scm", "scheme"),
        ("swift", "swift"),
        ("m", "objectivec"),
        ("dart", "dart"),
        ("jl", "julia"),
        ("f", "fortran"),
        ("f90", "fortran"),
        ("pas", "delphi"),
        ("ada", "ada"),
        ("adb", "ada"),
        ("ads", "ada"),
        ("coffee", "coffeescript"),
        ("sql", "sql"),
        ("proto", "protobuf"),
        ("graphql", "graphql"),
        ("tf", "hcl"),
        ("hcl", "hcl"),
        ("cmake", "cmake"),
        ("mak", "make"),
        ("mk", "make"),
        // Data and config
        ("json", "json"),
        ("jsonc", "json"),
        ("xml", "xml"),
        ("xsd", "xml"),
        ("xslt", "xml"),
        ("svg", "xml"),
        ("yaml", "yaml"),
        ("yml", "yaml"),
        ("toml", "toml"),
        ("ini", "ini"),
        ("cfg", "ini"),
        ("conf", "ini"),
        ("properties", "properties"),
        ("env", "shell"),
        ("csv", "csv"),
        ("tsv", "tsv"),
        // Documents
        ("md", "markdown"),
        ("markdown", "markdown"),
        ("rst", "rst"),
        ("tex", "tex"),
        ("org", "org"),
        ("diff", "diff"),
        ("patch", "diff"),
        ("feature", "cucumber"),
        ("txt", "text"),
        ("log", ""),
    ]
    .into_iter()
    .collect()
});

/// Returns the fence tag for `path`.
///
/// Exact file names win over extensions; extensions are compared
/// case-insensitively. Unknown files get [`DEFAULT_TAG`], and a few
/// extensions deliberately map to the empty tag (no language hint).
#[must_use]
pub fn tag_for(path: &Path) -> &'static str {
    if let Some(tag) = path
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| FILENAME_TAGS.get(name))
        .copied()
    {
        return tag;
    }

    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(|ext| EXTENSION_TAGS.get(ext.to_ascii_lowercase().as_str()))
        .copied()
        .unwrap_or(DEFAULT_TAG)
}
