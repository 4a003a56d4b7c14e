//! Loaded source tree: parsed modules plus per-module symbol tables.
//!
//! Built once, immutable afterwards, so independent document builds can
//! share it across threads.
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Component, Path, PathBuf};

use indexmap::IndexMap;
use thiserror::Error;
use tracing::debug;

use crate::error::{Error, Result};
use crate::resolve::{Declaration, Namespace, Resolved, SymbolResolver};
use crate::syntax::{self, Export, ImportBinding, Item, Module, ParseError, Span};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: ParseError,
    },
}

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// What an import/export specifier points at.
#[derive(Debug, Clone)]
enum Target {
    Module(String),
    Package(String),
    /// Relative specifier with no loaded file behind it.
    Missing(String),
}

#[derive(Debug)]
enum ImportKind {
    Named(String),
    Default,
    Namespace,
}

#[derive(Debug)]
struct ImportEntry {
    target: Target,
    kind: ImportKind,
}

#[derive(Debug)]
enum ExportEntry {
    Local(String),
    Reexport { target: Target, name: String },
    Namespace(Target),
}

#[derive(Debug)]
pub struct SourceModule {
    pub id: String,
    pub source: String,
    pub ast: Module,
    /// name → index into `ast.items`
    decls: HashMap<String, usize>,
    imports: HashMap<String, ImportEntry>,
    exports: IndexMap<String, ExportEntry>,
    star_exports: Vec<Target>,
}

#[derive(Debug, Default)]
pub struct Project {
    modules: IndexMap<String, SourceModule>,
}

// ————————————————————————————————————————————————————————————————————————————
// LOADING
// ————————————————————————————————————————————————————————————————————————————

impl Project {
    /// Build from in-memory sources; relative imports resolve only among them.
    pub fn from_sources<I, P, S>(sources: I) -> Result<Self, LoadError>
    where
        I: IntoIterator<Item = (P, S)>,
        P: AsRef<Path>,
        S: Into<String>,
    {
        let mut parsed = Vec::new();
        for (path, source) in sources {
            let id = module_id(path.as_ref());
            let source = source.into();
            let ast = syntax::parse_module(&source)
                .map_err(|source| LoadError::Parse { path: id.clone(), source })?;
            parsed.push((id, source, ast));
        }
        Ok(Self::assemble(parsed))
    }

    /// Read the entry files and, transitively, every relative import target.
    pub fn load<P: AsRef<Path>>(entries: &[P]) -> Result<Self, LoadError> {
        let mut parsed = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<PathBuf> =
            entries.iter().map(|p| p.as_ref().to_path_buf()).collect();

        while let Some(path) = queue.pop_front() {
            let id = module_id(&path);
            if !seen.insert(id.clone()) {
                continue;
            }
            let source = std::fs::read_to_string(&path)
                .map_err(|source| LoadError::Io { path: id.clone(), source })?;
            let ast = syntax::parse_module(&source)
                .map_err(|source| LoadError::Parse { path: id.clone(), source })?;
            debug!(module = %id, items = ast.items.len(), "parsed module");

            for specifier in module_specifiers(&ast) {
                if !is_relative(specifier) {
                    continue;
                }
                let found = candidate_paths(&id, specifier)
                    .into_iter()
                    .find(|candidate| Path::new(candidate).is_file());
                if let Some(found) = found {
                    queue.push_back(PathBuf::from(found));
                }
            }
            parsed.push((id, source, ast));
        }
        Ok(Self::assemble(parsed))
    }

    fn assemble(parsed: Vec<(String, String, Module)>) -> Self {
        let known: HashSet<String> = parsed.iter().map(|(id, _, _)| id.clone()).collect();
        let modules = parsed
            .into_iter()
            .map(|(id, source, ast)| {
                let module = SourceModule::new(id.clone(), source, ast, &known);
                (id, module)
            })
            .collect();
        Project { modules }
    }

    pub fn module(&self, id: &str) -> Option<&SourceModule> {
        self.modules.get(id)
    }

    pub fn module_ids(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    /// Declarations `module` exports from its own body, in export order.
    pub fn exported_declarations(&self, module: &str) -> Vec<Declaration<'_>> {
        let Some(m) = self.modules.get(module) else {
            return Vec::new();
        };
        m.exports
            .iter()
            .filter_map(|(_, entry)| match entry {
                ExportEntry::Local(local) => {
                    m.decls.get(local).and_then(|&i| m.declaration(i).ok())
                }
                _ => None,
            })
            .collect()
    }

    fn get(&self, module: &str) -> Result<&SourceModule> {
        self.modules.get(module).ok_or_else(|| Error::UnresolvedImport {
            specifier: module.to_string(),
            module: module.to_string(),
            at: None,
        })
    }

    fn follow_import(&self, m: &SourceModule, import: &ImportEntry) -> Result<Resolved<'_>> {
        match (&import.target, &import.kind) {
            (Target::Module(t), ImportKind::Named(name)) => self.resolve_export(t, name),
            (Target::Module(t), ImportKind::Default) => self.resolve_export(t, "default"),
            (Target::Module(t), ImportKind::Namespace) => {
                Ok(Resolved::Namespace(Namespace::Module(t.clone())))
            }
            (Target::Package(p), ImportKind::Named(name)) => Ok(Resolved::External {
                package: p.clone(),
                name: name.clone(),
            }),
            (Target::Package(p), ImportKind::Default) => Ok(Resolved::External {
                package: p.clone(),
                name: "default".to_string(),
            }),
            (Target::Package(p), ImportKind::Namespace) => {
                Ok(Resolved::Namespace(Namespace::Package(p.clone())))
            }
            (Target::Missing(specifier), _) => Err(Error::UnresolvedImport {
                specifier: specifier.clone(),
                module: m.id.clone(),
                at: None,
            }),
        }
    }

    fn resolve_export_inner(
        &self,
        module: &str,
        name: &str,
        visiting: &mut Vec<String>,
    ) -> Result<Resolved<'_>> {
        let not_found = || Error::UnknownIdentifier {
            name: name.to_string(),
            module: module.to_string(),
            at: None,
        };
        if visiting.iter().any(|v| v == module) {
            return Err(not_found());
        }
        visiting.push(module.to_string());
        let m = self.get(module)?;

        if let Some(entry) = m.exports.get(name) {
            return match entry {
                ExportEntry::Local(local) => self.resolve(local, module),
                ExportEntry::Reexport { target, name: imported } => match target {
                    Target::Module(t) => self.resolve_export_inner(t, imported, visiting),
                    Target::Package(p) => Ok(Resolved::External {
                        package: p.clone(),
                        name: imported.clone(),
                    }),
                    Target::Missing(specifier) => Err(Error::UnresolvedImport {
                        specifier: specifier.clone(),
                        module: m.id.clone(),
                        at: None,
                    }),
                },
                ExportEntry::Namespace(target) => match target {
                    Target::Module(t) => Ok(Resolved::Namespace(Namespace::Module(t.clone()))),
                    Target::Package(p) => Ok(Resolved::Namespace(Namespace::Package(p.clone()))),
                    Target::Missing(specifier) => Err(Error::UnresolvedImport {
                        specifier: specifier.clone(),
                        module: m.id.clone(),
                        at: None,
                    }),
                },
            };
        }

        // `export *` never forwards `default`
        if name == "default" {
            return Err(not_found());
        }
        for target in &m.star_exports {
            if let Target::Module(t) = target {
                match self.resolve_export_inner(t, name, visiting) {
                    Err(Error::UnknownIdentifier { .. }) => continue,
                    other => return other,
                }
            }
        }
        for target in &m.star_exports {
            if let Target::Package(p) = target {
                return Ok(Resolved::External {
                    package: p.clone(),
                    name: name.to_string(),
                });
            }
        }
        Err(not_found())
    }
}

impl SymbolResolver for Project {
    fn resolve(&self, name: &str, module: &str) -> Result<Resolved<'_>> {
        let m = self.get(module)?;
        if let Some(&index) = m.decls.get(name) {
            return Ok(Resolved::Declaration(m.declaration(index)?));
        }
        if let Some(import) = m.imports.get(name) {
            return self.follow_import(m, import);
        }
        Err(Error::UnknownIdentifier {
            name: name.to_string(),
            module: module.to_string(),
            at: None,
        })
    }

    fn resolve_export(&self, module: &str, name: &str) -> Result<Resolved<'_>> {
        self.resolve_export_inner(module, name, &mut Vec::new())
    }

    fn source_text(&self, module: &str, span: Span) -> Option<&str> {
        self.modules.get(module)?.source.get(span.start..span.end)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// SYMBOL TABLES
// ————————————————————————————————————————————————————————————————————————————

impl SourceModule {
    fn new(id: String, source: String, ast: Module, known: &HashSet<String>) -> Self {
        let mut decls = HashMap::new();
        let mut imports = HashMap::new();
        let mut exports = IndexMap::new();
        let mut star_exports = Vec::new();

        for (index, item) in ast.items.iter().enumerate() {
            match item {
                Item::Decl(d) => {
                    decls.insert(d.name.clone(), index);
                    if d.exported {
                        exports.insert(d.name.clone(), ExportEntry::Local(d.name.clone()));
                    }
                }
                Item::Import(import) => {
                    let target = resolve_target(&id, &import.source, known);
                    for binding in &import.bindings {
                        let (local, kind) = match binding {
                            ImportBinding::Default(local) => (local, ImportKind::Default),
                            ImportBinding::Namespace(local) => (local, ImportKind::Namespace),
                            ImportBinding::Named { imported, local } => {
                                (local, ImportKind::Named(imported.clone()))
                            }
                        };
                        imports.insert(local.clone(), ImportEntry { target: target.clone(), kind });
                    }
                }
                Item::Export(Export::Named { specifiers, source: None }) => {
                    for (local, exported) in specifiers {
                        exports.insert(exported.clone(), ExportEntry::Local(local.clone()));
                    }
                }
                Item::Export(Export::Named { specifiers, source: Some(source) }) => {
                    let target = resolve_target(&id, source, known);
                    for (imported, exported) in specifiers {
                        exports.insert(
                            exported.clone(),
                            ExportEntry::Reexport {
                                target: target.clone(),
                                name: imported.clone(),
                            },
                        );
                    }
                }
                Item::Export(Export::All { source, alias: None }) => {
                    star_exports.push(resolve_target(&id, source, known));
                }
                Item::Export(Export::All { source, alias: Some(alias) }) => {
                    let target = resolve_target(&id, source, known);
                    exports.insert(alias.clone(), ExportEntry::Namespace(target));
                }
            }
        }

        SourceModule { id, source, ast, decls, imports, exports, star_exports }
    }

    fn declaration(&self, index: usize) -> Result<Declaration<'_>> {
        let Some(Item::Decl(decl)) = self.ast.items.get(index) else {
            return Err(Error::unsupported("declaration index out of range"));
        };
        let Some(init) = decl.init.as_ref() else {
            let reason = format!("`{}` is declared without an initializer", decl.name);
            return Err(Error::unsupported(reason));
        };
        Ok(Declaration {
            name: &decl.name,
            module: &self.id,
            init,
            doc: decl.doc.as_deref(),
        })
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

/// Canonical module id: the path lexically normalized, `/`-separated.
pub fn module_id(path: &Path) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut absolute = false;
    for component in path.components() {
        match component {
            Component::RootDir => absolute = true,
            Component::Prefix(p) => parts.push(p.as_os_str().to_string_lossy().to_string()),
            Component::CurDir => {}
            Component::ParentDir => {
                if parts.last().is_some_and(|p| p != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..".to_string());
                }
            }
            Component::Normal(s) => parts.push(s.to_string_lossy().to_string()),
        }
    }
    let joined = parts.join("/");
    if absolute { format!("/{joined}") } else { joined }
}

fn is_relative(specifier: &str) -> bool {
    specifier.starts_with("./")
        || specifier.starts_with("../")
        || specifier == "."
        || specifier == ".."
        || specifier.starts_with('/')
}

/// Files a relative specifier may name, most specific first.
fn candidate_paths(from: &str, specifier: &str) -> Vec<String> {
    let dir = Path::new(from).parent().unwrap_or_else(|| Path::new(""));
    let base = module_id(&dir.join(specifier));
    let mut out = vec![base.clone()];
    for ext in ["ts", "tsx", "d.ts", "js"] {
        out.push(format!("{base}.{ext}"));
    }
    if let Some(stem) = base.strip_suffix(".js") {
        // ESM-style `./foo.js` naming a TypeScript source
        out.push(format!("{stem}.ts"));
        out.push(format!("{stem}.tsx"));
    }
    for index in ["index.ts", "index.tsx", "index.js"] {
        out.push(format!("{base}/{index}"));
    }
    out
}

fn resolve_target(from: &str, specifier: &str, known: &HashSet<String>) -> Target {
    if !is_relative(specifier) {
        return Target::Package(specifier.to_string());
    }
    candidate_paths(from, specifier)
        .into_iter()
        .find(|candidate| known.contains(candidate))
        .map(Target::Module)
        .unwrap_or_else(|| Target::Missing(specifier.to_string()))
}

fn module_specifiers(ast: &Module) -> impl Iterator<Item = &str> {
    ast.items.iter().filter_map(|item| match item {
        Item::Import(import) => Some(import.source.as_str()),
        Item::Export(Export::Named { source: Some(source), .. }) => Some(source.as_str()),
        Item::Export(Export::All { source, .. }) => Some(source.as_str()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(sources: &[(&str, &str)]) -> Project {
        Project::from_sources(sources.iter().copied()).expect("load failed")
    }

    fn declaration_of<'a>(resolved: Resolved<'a>) -> Declaration<'a> {
        match resolved {
            Resolved::Declaration(d) => d,
            other => panic!("expected declaration, got {other:?}"),
        }
    }

    #[test]
    fn module_ids_are_normalized() {
        assert_eq!(module_id(Path::new("./src/../src/a.ts")), "src/a.ts");
        assert_eq!(module_id(Path::new("/x/./y/../z.ts")), "/x/z.ts");
        assert_eq!(module_id(Path::new("../up.ts")), "../up.ts");
    }

    #[test]
    fn follows_named_aliased_and_default_imports() {
        let p = project(&[
            ("src/index.ts", "import { Foo as Bar } from './foo';\nimport D from './foo';"),
            ("src/foo.ts", "/** Foo doc */\nexport const Foo = 1;\nexport default Foo;"),
        ]);
        let d = declaration_of(p.resolve("Bar", "src/index.ts").unwrap());
        assert_eq!((d.name, d.module, d.doc), ("Foo", "src/foo.ts", Some("Foo doc")));
        let d = declaration_of(p.resolve("D", "src/index.ts").unwrap());
        assert_eq!(d.name, "default");
    }

    #[test]
    fn follows_reexports_and_star_exports() {
        let p = project(&[
            ("src/index.ts", "import { A, B, C } from './barrel';"),
            (
                "src/barrel/index.ts",
                "export { A } from '../a';\nexport * from '../b';\nexport * from 'io-ts';",
            ),
            ("src/a.ts", "export const A = 1;"),
            ("src/b.ts", "const local = 2;\nexport { local as B };"),
        ]);
        assert_eq!(declaration_of(p.resolve("A", "src/index.ts").unwrap()).module, "src/a.ts");
        let b = declaration_of(p.resolve("B", "src/index.ts").unwrap());
        assert_eq!((b.name, b.module), ("local", "src/b.ts"));
        // unknown to every local module, so the package star export claims it
        assert!(matches!(
            p.resolve("C", "src/index.ts").unwrap(),
            Resolved::External { package, name } if package == "io-ts" && name == "C"
        ));
    }

    #[test]
    fn namespaces_and_packages() {
        let p = project(&[
            (
                "main.ts",
                "import * as t from 'io-ts';\n\
                 import * as local from './lib';\n\
                 export * as again from './lib';",
            ),
            ("lib.ts", "export const X = 1;"),
        ]);
        assert!(matches!(
            p.resolve_member("t", "string", "main.ts").unwrap(),
            Resolved::External { package, name } if package == "io-ts" && name == "string"
        ));
        assert_eq!(declaration_of(p.resolve_member("local", "X", "main.ts").unwrap()).name, "X");
        assert!(matches!(
            p.resolve_export("main.ts", "again").unwrap(),
            Resolved::Namespace(Namespace::Module(m)) if m == "lib.ts"
        ));
    }

    #[test]
    fn missing_relative_import_is_unresolved() {
        let p = project(&[("a.ts", "import { X } from './nowhere';")]);
        assert!(matches!(
            p.resolve("X", "a.ts"),
            Err(Error::UnresolvedImport { specifier, .. }) if specifier == "./nowhere"
        ));
        assert!(matches!(p.resolve("Y", "a.ts"), Err(Error::UnknownIdentifier { .. })));
    }

    #[test]
    fn star_export_cycles_terminate() {
        let p = project(&[
            ("a.ts", "export * from './b';"),
            ("b.ts", "export * from './a';\nexport const Y = 1;"),
        ]);
        assert!(matches!(p.resolve_export("a.ts", "Nope"), Err(Error::UnknownIdentifier { .. })));
        assert_eq!(declaration_of(p.resolve_export("a.ts", "Y").unwrap()).name, "Y");
    }

    #[test]
    fn exported_declarations_in_order() {
        let p = project(&[(
            "m.ts",
            "export const B = 1;\nconst hidden = 2;\nexport const A = 3;\nexport { hidden as C };",
        )]);
        let names: Vec<&str> = p.exported_declarations("m.ts").iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["B", "A", "hidden"]);
    }
}
