//! JavaScript / TypeScript / JSX transformation through oxc.
//!
//! Parse, build semantic scoping, strip types and lower JSX with
//! `oxc_transformer`, print with `oxc_codegen`. Specifiers are collected
//! from the parsed program as written, skipping type-only imports and
//! exports, and then from the transformed program so that runtime imports
//! injected by the transformer (JSX) are included too.

use std::sync::Arc;

use async_trait::async_trait;
use howth_graph::{Artifact, ConfigHash, Dialect, SourceType};
use oxc_allocator::Allocator;
use oxc_ast::ast::{
    Argument, CallExpression, ExportAllDeclaration, ExportNamedDeclaration, Expression,
    ImportDeclaration, ImportDeclarationSpecifier, ImportExpression,
};
use oxc_ast_visit::{Visit, walk};
use oxc_codegen::Codegen;
use oxc_parser::Parser;
use oxc_semantic::SemanticBuilder;
use oxc_span::SourceType as OxcSourceType;
use oxc_transformer::{TransformOptions, Transformer as OxcTransformer};
use rustc_hash::FxHashSet;

use super::{TransformError, TransformRequest, Transformer};

/// oxc crate line the emitted code depends on.
const OXC_LINE: &str = "oxc/0.101";

/// Maximum parse errors quoted in a failure message.
const MAX_REPORTED_ERRORS: usize = 3;

#[derive(Debug, Default)]
pub struct ScriptTransformer {
    options: Arc<TransformOptions>,
}

impl ScriptTransformer {
    pub fn new(options: TransformOptions) -> Self {
        Self {
            options: Arc::new(options),
        }
    }

    fn oxc_source_type(request: &TransformRequest) -> OxcSourceType {
        OxcSourceType::from_path(&request.path).unwrap_or_else(|_| match request.source_type {
            SourceType::TypeScript => OxcSourceType::ts(),
            SourceType::Tsx => OxcSourceType::tsx(),
            SourceType::Jsx => OxcSourceType::jsx(),
            _ => OxcSourceType::mjs(),
        })
    }

    fn run(
        options: &TransformOptions,
        request: &TransformRequest,
    ) -> Result<Artifact, TransformError> {
        let fail = |errors: Vec<String>| {
            let total = errors.len();
            let mut message = errors
                .into_iter()
                .take(MAX_REPORTED_ERRORS)
                .collect::<Vec<_>>()
                .join("; ");
            if total > MAX_REPORTED_ERRORS {
                message.push_str(&format!(" (+{} more)", total - MAX_REPORTED_ERRORS));
            }
            TransformError::new(&request.path, message)
        };

        let allocator = Allocator::default();
        let source_type = Self::oxc_source_type(request);

        let parsed = Parser::new(&allocator, &request.source, source_type).parse();
        if parsed.panicked || !parsed.errors.is_empty() {
            return Err(fail(parsed.errors.iter().map(ToString::to_string).collect()));
        }
        let mut program = parsed.program;
        let mut collector = SpecifierCollector::default();
        collector.visit_program(&program);

        let scoping = SemanticBuilder::new()
            .build(&program)
            .semantic
            .into_scoping();
        let transformed = OxcTransformer::new(&allocator, &request.path, options)
            .build_with_scoping(scoping, &mut program);
        if !transformed.errors.is_empty() {
            return Err(fail(
                transformed.errors.iter().map(ToString::to_string).collect(),
            ));
        }

        collector.visit_program(&program);
        let specifiers = collector.specifiers;
        let code = Codegen::new().build(&program).code;

        Ok(Artifact::new(code, specifiers, request.source_type))
    }
}

#[async_trait]
impl Transformer for ScriptTransformer {
    fn name(&self) -> &'static str {
        "script"
    }

    fn fingerprint(&self) -> ConfigHash {
        ConfigHash::builder()
            .field(OXC_LINE)
            .field(format!("{:?}", self.options))
            .finish()
    }

    fn supports(&self, dialect: Dialect) -> bool {
        matches!(
            dialect,
            Dialect::Script | Dialect::TypedScript | Dialect::Markup
        )
    }

    async fn transform(&self, request: &TransformRequest) -> Result<Artifact, TransformError> {
        let options = Arc::clone(&self.options);
        let owned = request.clone();
        tokio::task::spawn_blocking(move || Self::run(&options, &owned))
            .await
            .map_err(|err| {
                TransformError::new(&request.path, format!("transform task failed: {err}"))
            })?
    }
}

/// Runtime specifiers in order of first appearance.
#[derive(Default)]
struct SpecifierCollector {
    specifiers: Vec<String>,
    seen: FxHashSet<String>,
}

impl SpecifierCollector {
    fn push(&mut self, specifier: &str) {
        if self.seen.insert(specifier.to_string()) {
            self.specifiers.push(specifier.to_string());
        }
    }
}

impl<'a> Visit<'a> for SpecifierCollector {
    fn visit_import_declaration(&mut self, decl: &ImportDeclaration<'a>) {
        if !decl.import_kind.is_type() && !imports_only_types(decl) {
            self.push(decl.source.value.as_str());
        }
    }

    fn visit_export_named_declaration(&mut self, decl: &ExportNamedDeclaration<'a>) {
        if let Some(source) = &decl.source {
            let only_types = !decl.specifiers.is_empty()
                && decl.specifiers.iter().all(|spec| spec.export_kind.is_type());
            if !decl.export_kind.is_type() && !only_types {
                self.push(source.value.as_str());
            }
        }
        walk::walk_export_named_declaration(self, decl);
    }

    fn visit_export_all_declaration(&mut self, decl: &ExportAllDeclaration<'a>) {
        if !decl.export_kind.is_type() {
            self.push(decl.source.value.as_str());
        }
    }

    fn visit_import_expression(&mut self, expr: &ImportExpression<'a>) {
        if let Expression::StringLiteral(literal) = &expr.source {
            self.push(literal.value.as_str());
        }
        walk::walk_import_expression(self, expr);
    }

    fn visit_call_expression(&mut self, call: &CallExpression<'a>) {
        if let Expression::Identifier(callee) = &call.callee {
            if callee.name.as_str() == "require" && call.arguments.len() == 1 {
                if let Some(Argument::StringLiteral(literal)) = call.arguments.first() {
                    self.push(literal.value.as_str());
                }
            }
        }
        walk::walk_call_expression(self, call);
    }
}

/// `import { type A, type B } from "x"`: every binding is type-only.
fn imports_only_types(decl: &ImportDeclaration<'_>) -> bool {
    decl.specifiers.as_ref().is_some_and(|specifiers| {
        !specifiers.is_empty()
            && specifiers.iter().all(|spec| {
                matches!(spec, ImportDeclarationSpecifier::ImportSpecifier(named) if named.import_kind.is_type())
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    async fn transform(path: &str, source: &str) -> Result<Artifact, TransformError> {
        let path = PathBuf::from(path);
        let request = TransformRequest {
            source_type: SourceType::from_path(&path),
            path,
            source: source.into(),
        };
        ScriptTransformer::default().transform(&request).await
    }

    #[tokio::test]
    async fn strips_types_and_collects_imports() {
        let artifact = transform(
            "/proj/a.ts",
            r#"
import type { Config } from "./types";
import { helper } from "./helper";
import fs from "node:fs";
export * from "./reexport";
export { x } from "./named";

const config: Config = { level: 1 };
helper(config, fs);
"#,
        )
        .await
        .unwrap();

        assert!(!artifact.code.contains(": Config"));
        assert!(!artifact.specifiers.contains(&"./types".to_string()));
        assert_eq!(
            artifact.specifiers,
            vec!["./helper", "node:fs", "./reexport", "./named"]
        );
    }

    #[tokio::test]
    async fn dynamic_imports_and_require_are_collected_once() {
        let artifact = transform(
            "/proj/a.js",
            r#"
const a = require("./a");
const again = require("./a");
const lazy = () => import("./lazy");
const computed = import(name);
const notRequire = load("./nope");
"#,
        )
        .await
        .unwrap();

        assert_eq!(artifact.specifiers, vec!["./a", "./lazy"]);
    }

    #[tokio::test]
    async fn imports_without_value_uses_keep_their_specifiers() {
        let artifact = transform(
            "/proj/a.ts",
            r#"
import fs from "node:fs";
import { b } from "./b";
import { type T } from "./only-types";
import { type U, v } from "./mixed";
export { type W } from "./type-reexport";
import "./side-effect";
export const a: T | U = 1;
"#,
        )
        .await
        .unwrap();

        assert_eq!(
            artifact.specifiers,
            vec!["node:fs", "./b", "./mixed", "./side-effect"]
        );
        assert!(!artifact.code.contains("./b"));
    }

    #[tokio::test]
    async fn injected_jsx_runtime_import_is_collected() {
        let artifact = transform(
            "/proj/view.tsx",
            "import { label } from \"./label\";\nexport const view = <p>{label}</p>;\n",
        )
        .await
        .unwrap();

        assert_eq!(artifact.specifiers[0], "./label");
        assert!(
            artifact
                .specifiers
                .iter()
                .any(|specifier| specifier.ends_with("jsx-runtime")),
            "{:?}",
            artifact.specifiers
        );
    }

    #[tokio::test]
    async fn syntax_errors_fail_the_transform() {
        let err = transform("/proj/broken.ts", "const = ;").await.unwrap_err();
        assert_eq!(err.path, PathBuf::from("/proj/broken.ts"));
        assert!(!err.message.is_empty());
    }

    #[test]
    fn fingerprint_is_stable() {
        assert_eq!(
            ScriptTransformer::default().fingerprint(),
            ScriptTransformer::default().fingerprint()
        );
    }
}
