// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Rewriter properties over realistic C# files.
//!
//! # Organization
//!
//! - idempotence: applying a rewrite to its own output changes nothing
//! - round_trip: A→B followed by B→A restores the original bytes
//! - scenarios: using swaps and trivia preservation

use migtool_csharp::{apply_all, NamespaceRewrite, Rewrite, TypeRename, UsingRewrite};

const SERVICE: &str = r#"// <auto-generated/>
using System;
using System.Collections.Generic;
using Acme.Core;
using Acme.Core.Models;
using static Acme.Core.Guard;

namespace Acme.Core.Services
{
    /// <summary>Does things with <see cref="Foo"/>.</summary>
    [Serializable]
    public sealed class FooService : IFooService
    {
        private readonly List<Foo> _items = new List<Foo>();

        public FooService(Acme.Core.Models.Options options)
        {
            var first = (Foo)_items[0];
            if (first is Foo foo) { Acme.Core.Util.Log($"{foo}"); }
        }
    }
}
"#;

fn rewrites() -> Vec<Rewrite> {
    vec![
        NamespaceRewrite::new()
            .map("Acme.Core", "Contoso.Kernel")
            .with_qualified_names()
            .into(),
        UsingRewrite::new().replace("Acme.Core", "Contoso.Kernel").into(),
        TypeRename::new("Foo", "Widget").into(),
    ]
}

mod idempotence {
    use super::*;

    #[test]
    fn every_rewrite_is_stable_on_its_output() {
        for rewrite in rewrites() {
            let once = rewrite.apply(SERVICE).unwrap();
            let twice = rewrite.apply(&once.text).unwrap();
            assert!(twice.is_unchanged(), "{:?} not idempotent", rewrite);
            assert_eq!(twice.text, once.text);
        }
    }

    #[test]
    fn nested_target_namespace_is_stable() {
        let rewrite = Rewrite::from(
            NamespaceRewrite::new()
                .map("Acme.Core", "Acme.Core.V2")
                .with_qualified_names(),
        );
        let once = rewrite.apply(SERVICE).unwrap();
        assert!(once.text.contains("namespace Acme.Core.V2.Services"));
        assert!(once.text.contains("Acme.Core.V2.Models.Options options"));
        assert!(rewrite.apply(&once.text).unwrap().is_unchanged());
    }

    #[test]
    fn nothing_matching_is_a_no_op() {
        let output = apply_all(
            SERVICE,
            &[
                NamespaceRewrite::new().map("Other", "Else").into(),
                UsingRewrite::new().remove("Not.Imported").into(),
                TypeRename::new("Missing", "Absent").into(),
            ],
        )
        .unwrap();
        assert_eq!(output.text, SERVICE);
        assert_eq!(output.manifest.edit_count, 0);
        assert!(output.manifest.applied.is_empty());
    }
}

mod round_trip {
    use super::*;

    #[test]
    fn namespace_and_usings() {
        let forward = apply_all(
            SERVICE,
            &[
                NamespaceRewrite::new()
                    .map("Acme.Core", "Contoso.Kernel")
                    .with_qualified_names()
                    .into(),
                UsingRewrite::new().replace("Acme.Core", "Contoso.Kernel").into(),
            ],
        )
        .unwrap();
        assert!(!forward.text.contains("Acme.Core"));

        let back = apply_all(
            &forward.text,
            &[
                NamespaceRewrite::new()
                    .map("Contoso.Kernel", "Acme.Core")
                    .with_qualified_names()
                    .into(),
                UsingRewrite::new().replace("Contoso.Kernel", "Acme.Core").into(),
            ],
        )
        .unwrap();
        assert_eq!(back.text, SERVICE);
    }

    #[test]
    fn type_rename() {
        let forward = TypeRename::new("Foo", "Widget").apply(SERVICE).unwrap();
        assert!(forward.text.contains("List<Widget>"));
        assert!(forward.text.contains("(Widget)_items[0]"));
        assert!(forward.text.contains("is Widget foo"));
        let back = TypeRename::new("Widget", "Foo").apply(&forward.text).unwrap();
        assert_eq!(back.text, SERVICE);
    }
}

mod scenarios {
    use super::*;

    #[test]
    fn swapping_the_only_using() {
        let source = "using Acme.Core;\n\nnamespace Acme.App\n{\n    class Bar { }\n}\n";
        let swap = UsingRewrite::new().remove("Acme.Core").add("Acme.Core.V2");
        let output = swap.apply(source).unwrap();
        assert_eq!(
            output.text,
            "using Acme.Core.V2;\n\nnamespace Acme.App\n{\n    class Bar { }\n}\n"
        );
        assert_eq!(output.text.matches("using Acme.Core.V2;").count(), 1);
        assert!(swap.apply(&output.text).unwrap().is_unchanged());
    }

    #[test]
    fn swapping_keeps_other_imports_in_order() {
        let output = UsingRewrite::new()
            .remove("Acme.Core")
            .add("Acme.Core.V2")
            .apply(SERVICE)
            .unwrap();
        let usings: Vec<&str> = output
            .text
            .lines()
            .filter(|line| line.starts_with("using"))
            .collect();
        assert_eq!(
            usings,
            vec![
                "using System;",
                "using System.Collections.Generic;",
                "using Acme.Core.Models;",
                "using Acme.Core.V2;",
                "using static Acme.Core.Guard;",
            ]
        );
    }

    #[test]
    fn comments_and_strings_are_untouched() {
        let output = TypeRename::new("Foo", "Widget").apply(SERVICE).unwrap();
        assert!(output.text.contains("<see cref=\"Foo\"/>"));
        assert!(output.text.contains("$\"{foo}\""));
        assert!(output.text.starts_with("// <auto-generated/>\n"));
    }
}
