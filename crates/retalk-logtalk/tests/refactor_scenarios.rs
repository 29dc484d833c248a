//! End-to-end refactoring scenarios.
//!
//! Each test runs one action through the [`Engine`] against an in-memory
//! workspace, answering prompts from a script, and checks the files the
//! host holds afterwards.

use retalk_core::config::FormatConfig;
use retalk_core::host::MemoryHost;
use retalk_core::interaction::{MessageLevel, ScriptedAdapter};
use retalk_core::types::{Position, Range};
use retalk_logtalk::action::{
    ConvertTarget, DirectiveTarget, EntityTarget, NumberTarget, PredicateTarget, SelectionTarget, VariableTarget,
};
use retalk_logtalk::syntax::{EntityIdentifier, EntityKind, Indicator};
use retalk_logtalk::{Engine, Outcome, RefactorAction, RefactorError, RefactorResult, TextIndex};

// ============================================================================
// Test Infrastructure
// ============================================================================

/// Wrap body lines in `:- object(a).` so the body starts at line 2.
fn object(body: &str) -> String {
    format!(":- object(a).\n\n{}\n\n:- end_object.\n", body)
}

fn quiet_format() -> FormatConfig {
    FormatConfig {
        new_entity_info: false,
        ..FormatConfig::default()
    }
}

fn run(host: &MemoryHost, answers: &[&str], action: &RefactorAction) -> (RefactorResult<Outcome>, ScriptedAdapter) {
    let index = TextIndex::new(host);
    let ui = ScriptedAdapter::new(answers.iter().copied());
    let result = Engine::new(host, &index, &ui)
        .with_format(quiet_format())
        .execute(action);
    (result, ui)
}

fn point(line: u32, col: u32) -> Position {
    Position::new(line, col)
}

fn lines(from: u32, to: u32) -> Range {
    Range::new(point(from, 0), point(to, 0))
}

fn entity(uri: &str, identifier: &str, kind: EntityKind) -> EntityTarget {
    EntityTarget {
        uri: uri.into(),
        position: point(0, 10),
        kind,
        entity: EntityIdentifier::parse(identifier).unwrap(),
    }
}

// ============================================================================
// Predicate arguments
// ============================================================================

mod argument_scenarios {
    use super::*;

    #[test]
    fn add_argument_leaves_other_predicates_alone() {
        let host = MemoryHost::with_files([("a.lgt", object("\t:- public(foo/1).\n\n\tfoo(X) :- bar(X)."))]);
        let action = RefactorAction::AddArgument(PredicateTarget {
            uri: "a.lgt".into(),
            position: point(4, 2),
            indicator: Indicator::predicate("foo", 1),
        });
        let (result, _) = run(&host, &["Y", "2"], &action);
        result.unwrap();
        let text = host.text("a.lgt").unwrap();
        assert!(text.contains("\t:- public(foo/2)."));
        assert!(text.contains("\tfoo(X, Y) :- bar(X)."));
    }

    #[test]
    fn removing_the_sole_argument() {
        let src = object(
            "\t:- public(foo/1).\n\t:- mode(foo(?integer), zero_or_one).\n\n\tfoo(1).\n\n\ttest :-\n\t\tfoo(1).",
        );
        let host = MemoryHost::with_files([("a.lgt", src)]);
        let action = RefactorAction::RemoveArgument(PredicateTarget {
            uri: "a.lgt".into(),
            position: point(2, 12),
            indicator: Indicator::predicate("foo", 1),
        });
        let (result, ui) = run(&host, &[], &action);
        result.unwrap();
        assert_eq!(
            host.text("a.lgt").unwrap(),
            object("\t:- public(foo/0).\n\t:- mode(foo, zero_or_one).\n\n\tfoo.\n\n\ttest :-\n\t\tfoo.")
        );
        assert!(ui.messages().iter().any(|(l, _)| *l == MessageLevel::Success));
    }

    #[test]
    fn identity_reorder_changes_nothing() {
        let src = object("\t:- public(foo/3).\n\n\tfoo(A, B, C) :- bar(A, B, C).");
        let host = MemoryHost::with_files([("a.lgt", src.clone())]);
        let action = RefactorAction::ReorderArguments(PredicateTarget {
            uri: "a.lgt".into(),
            position: point(2, 12),
            indicator: Indicator::predicate("foo", 3),
        });
        let (result, ui) = run(&host, &["1,2,3"], &action);
        assert!(!result.unwrap().edit.has_edits());
        assert_eq!(host.text("a.lgt").unwrap(), src);
        assert!(ui.messages().iter().any(|(l, m)| *l == MessageLevel::Info && m == "nothing to change"));
    }

    #[test]
    fn two_arguments_swap_without_asking() {
        let src = object("\t:- public(pair/2).\n\n\tpair(a, b).\n\n\ttest :-\n\t\tpair(X, Y).");
        let host = MemoryHost::with_files([("a.lgt", src)]);
        let action = RefactorAction::ReorderArguments(PredicateTarget {
            uri: "a.lgt".into(),
            position: point(2, 12),
            indicator: Indicator::predicate("pair", 2),
        });
        let (result, ui) = run(&host, &["2,1"], &action);
        result.unwrap();
        assert_eq!(ui.remaining(), 1);
        assert_eq!(
            host.text("a.lgt").unwrap(),
            object("\t:- public(pair/2).\n\n\tpair(b, a).\n\n\ttest :-\n\t\tpair(Y, X).")
        );
    }

    const STACK: &str = "\
:- object(stack).

\t:- public(push/2).

\tpush(X, [X]) :-
\t\tlist::push(X, _).

:- end_object.
";

    const LIST: &str = "\
:- object(list).

\t:- public(push/2).

\tpush(_, []).

:- end_object.
";

    const CLIENT: &str = "\
:- object(client).

\trun :-
\t\tstack::push(a, _),
\t\tpush(b, _).

\tpush(_, _).

:- end_object.
";

    fn stack_workspace() -> MemoryHost {
        MemoryHost::with_files([("stack.lgt", STACK), ("list.lgt", LIST), ("client.lgt", CLIENT)])
    }

    fn push_in_stack() -> PredicateTarget {
        PredicateTarget {
            uri: "stack.lgt".into(),
            position: point(2, 12),
            indicator: Indicator::predicate("push", 2),
        }
    }

    #[test]
    fn calls_to_other_objects_keep_their_arity() {
        let host = stack_workspace();
        let (result, _) = run(&host, &["Z", "3"], &RefactorAction::AddArgument(push_in_stack()));
        result.unwrap();
        assert_eq!(
            host.text("stack.lgt").unwrap(),
            ":- object(stack).\n\n\t:- public(push/3).\n\n\tpush(X, [X], Z) :-\n\t\tlist::push(X, _).\n\n:- end_object.\n"
        );
        assert_eq!(host.text("list.lgt").unwrap(), LIST);
    }

    #[test]
    fn added_argument_reaches_qualified_calls_in_other_files() {
        let host = stack_workspace();
        let (result, _) = run(&host, &["Z", "3"], &RefactorAction::AddArgument(push_in_stack()));
        result.unwrap();
        assert_eq!(
            host.text("client.lgt").unwrap(),
            ":- object(client).\n\n\trun :-\n\t\tstack::push(a, _, Z),\n\t\tpush(b, _).\n\n\tpush(_, _).\n\n:- end_object.\n"
        );
    }

    #[test]
    fn removed_argument_reaches_qualified_calls_in_other_files() {
        let host = stack_workspace();
        let (result, _) = run(&host, &["2"], &RefactorAction::RemoveArgument(push_in_stack()));
        result.unwrap();
        assert_eq!(
            host.text("stack.lgt").unwrap(),
            ":- object(stack).\n\n\t:- public(push/1).\n\n\tpush(X) :-\n\t\tlist::push(X, _).\n\n:- end_object.\n"
        );
        assert_eq!(
            host.text("client.lgt").unwrap(),
            ":- object(client).\n\n\trun :-\n\t\tstack::push(a),\n\t\tpush(b, _).\n\n\tpush(_, _).\n\n:- end_object.\n"
        );
        assert_eq!(host.text("list.lgt").unwrap(), LIST);
    }

    const DOCUMENTED: &str = "\t:- public(foo/1).
\t:- info(foo/1, [
\t\tcomment is 'Foo.',
\t\targnames is ['X'],
\t\targuments is ['X' - 'Input']
\t]).

\tfoo(1).";

    fn foo_target() -> PredicateTarget {
        PredicateTarget {
            uri: "a.lgt".into(),
            position: point(2, 12),
            indicator: Indicator::predicate("foo", 1),
        }
    }

    #[test]
    fn multi_line_info_lists_grow() {
        let host = MemoryHost::with_files([("a.lgt", object(DOCUMENTED))]);
        let (result, _) = run(&host, &["Y", "2"], &RefactorAction::AddArgument(foo_target()));
        result.unwrap();
        assert_eq!(
            host.text("a.lgt").unwrap(),
            object(
                "\t:- public(foo/2).
\t:- info(foo/2, [
\t\tcomment is 'Foo.',
\t\targnames is ['X', 'Y'],
\t\targuments is ['X' - 'Input', 'Y' - '']
\t]).

\tfoo(1, Y)."
            )
        );
    }

    #[test]
    fn multi_line_info_lists_emptied_together() {
        let host = MemoryHost::with_files([("a.lgt", object(DOCUMENTED))]);
        let (result, _) = run(&host, &[], &RefactorAction::RemoveArgument(foo_target()));
        result.unwrap();
        assert_eq!(
            host.text("a.lgt").unwrap(),
            object("\t:- public(foo/0).\n\t:- info(foo/0, [\n\t\tcomment is 'Foo.'\n\t]).\n\n\tfoo.")
        );
    }

    #[test]
    fn non_terminal_argument_added_to_every_rule() {
        let src = object("\t:- public(digits//1).\n\n\tdigits([D|Ds]) -->\n\t\tdigit(D), digits(Ds).\n\tdigits([]) --> [].");
        let host = MemoryHost::with_files([("a.lgt", src)]);
        let action = RefactorAction::AddArgument(PredicateTarget {
            uri: "a.lgt".into(),
            position: point(2, 12),
            indicator: Indicator::non_terminal("digits", 1),
        });
        let (result, _) = run(&host, &["N", "2"], &action);
        result.unwrap();
        assert_eq!(
            host.text("a.lgt").unwrap(),
            object(
                "\t:- public(digits//2).\n\n\tdigits([D|Ds], N) -->\n\t\tdigit(D), digits(Ds, N).\n\tdigits([], N) --> []."
            )
        );
    }
}

// ============================================================================
// Entity parameters
// ============================================================================

mod parameter_scenarios {
    use super::*;

    #[test]
    fn single_parameter_reorder_is_a_no_op() {
        let src = ":- object(stack(_Type_)).\n\n:- end_object.\n";
        let host = MemoryHost::with_files([("stack.lgt", src)]);
        let action = RefactorAction::ReorderParameters(entity("stack.lgt", "stack(_Type_)", EntityKind::Object));
        let (result, ui) = run(&host, &[], &action);
        result.unwrap();
        assert_eq!(host.text("stack.lgt").unwrap(), src);
        assert_eq!(ui.remaining(), 0);
    }

    #[test]
    fn added_parameter_reaches_references() {
        let host = MemoryHost::with_files([
            ("stack.lgt", ":- object(stack).\n\n:- end_object.\n"),
            (
                "client.lgt",
                ":- object(client).\n\n\trun :-\n\t\tstack::push(1).\n\n:- end_object.\n",
            ),
        ]);
        let action = RefactorAction::AddParameter(entity("stack.lgt", "stack", EntityKind::Object));
        let (result, _) = run(&host, &["Size", ""], &action);
        result.unwrap();
        assert_eq!(
            host.text("stack.lgt").unwrap(),
            ":- object(stack(_Size_)).\n\n:- end_object.\n"
        );
        assert!(host.text("client.lgt").unwrap().contains("stack(_)::push(1)"));
    }
}

// ============================================================================
// Extraction
// ============================================================================

mod extraction_scenarios {
    use super::*;

    #[test]
    fn trailing_comma_selection_is_rejected() {
        let host = MemoryHost::with_files([("a.lgt", object("\tfoo :-\n\t\tbar,\n\t\tbaz."))]);
        let action = RefactorAction::ExtractToNewFile(SelectionTarget {
            uri: "a.lgt".into(),
            range: lines(2, 4),
        });
        let (result, ui) = run(&host, &["x.lgt"], &action);
        let err = result.unwrap_err();
        assert!(matches!(err, RefactorError::Precondition(_)));
        assert_eq!(err.to_string(), "selection contains incomplete terms");
        assert_eq!(ui.remaining(), 1);
    }

    #[test]
    fn extract_to_new_file() {
        let host = MemoryHost::with_files([("a.lgt", object("\tfoo(1).\n\tfoo(2)."))]);
        let action = RefactorAction::ExtractToNewFile(SelectionTarget {
            uri: "a.lgt".into(),
            range: lines(2, 4),
        });
        let (result, _) = run(&host, &["helpers"], &action);
        result.unwrap();
        assert_eq!(host.text("helpers.lgt").unwrap(), "foo(1).\nfoo(2).\n");
        assert_eq!(host.text("a.lgt").unwrap(), ":- object(a).\n\n\n:- end_object.\n");
    }

    #[test]
    fn extract_to_new_entity() {
        let host = MemoryHost::with_files([("a.lgt", object("\tfoo(1).\n\tfoo(2)."))]);
        let action = RefactorAction::ExtractToNewEntity(SelectionTarget {
            uri: "a.lgt".into(),
            range: lines(2, 4),
        });
        let (result, _) = run(&host, &["category", "facts", ""], &action);
        result.unwrap();
        assert_eq!(
            host.text("facts.lgt").unwrap(),
            ":- category(facts).\n\n\tfoo(1).\n\tfoo(2).\n\n:- end_category.\n"
        );
    }

    #[test]
    fn extract_to_existing_entity() {
        let host = MemoryHost::with_files([
            ("a.lgt", object("\tfoo(1).")),
            ("b.lgt", ":- object(b).\n\n\tbar.\n\n:- end_object.\n".to_string()),
        ]);
        let action = RefactorAction::ExtractToEntity(SelectionTarget {
            uri: "a.lgt".into(),
            range: lines(2, 3),
        });
        let (result, _) = run(&host, &["1"], &action);
        result.unwrap();
        assert_eq!(
            host.text("b.lgt").unwrap(),
            ":- object(b).\n\n\tbar.\n\n\tfoo(1).\n\n:- end_object.\n"
        );
        assert_eq!(host.text("a.lgt").unwrap(), ":- object(a).\n\n\n:- end_object.\n");
    }

    #[test]
    fn extract_protocol() {
        let src = ":- object(stack).\n\n\t:- public(push/2).\n\t:- mode(push(+term, -list), one).\n\n\tpush(X, [X]).\n\n:- end_object.\n";
        let host = MemoryHost::with_files([("stack.lgt", src)]);
        let action = RefactorAction::ExtractProtocol(entity("stack.lgt", "stack", EntityKind::Object));
        let (result, _) = run(&host, &["", ""], &action);
        result.unwrap();
        assert_eq!(
            host.text("stack_protocol.lgt").unwrap(),
            ":- protocol(stack_protocol).\n\n\t:- public(push/2).\n\t:- mode(push(+term, -list), one).\n\n:- end_protocol.\n"
        );
        assert_eq!(
            host.text("stack.lgt").unwrap(),
            ":- object(stack, implements(stack_protocol)).\n\n\tpush(X, [X]).\n\n:- end_object.\n"
        );
    }

    #[test]
    fn existing_destination_file_is_refused() {
        let host = MemoryHost::with_files([
            ("a.lgt", object("\tfoo(1).")),
            ("taken.lgt", String::new()),
        ]);
        let action = RefactorAction::ExtractToNewFile(SelectionTarget {
            uri: "a.lgt".into(),
            range: lines(2, 3),
        });
        let (result, _) = run(&host, &["taken.lgt"], &action);
        assert!(matches!(result, Err(RefactorError::Precondition(_))));
        assert_eq!(host.text("a.lgt").unwrap(), object("\tfoo(1)."));
    }
}

// ============================================================================
// Entity conversion
// ============================================================================

mod conversion_scenarios {
    use super::*;

    fn convert(from: EntityKind, to: EntityKind) -> RefactorAction {
        RefactorAction::ConvertEntity(ConvertTarget {
            uri: "a.lgt".into(),
            position: point(0, 10),
            from,
            to,
        })
    }

    #[test]
    fn object_to_category_drops_invalid_relations() {
        let src = ":- object(cache,\n\timplements(p),\n\tinstantiates(c)).\n\n\tfoo.\n\n:- end_object.\n";
        let host = MemoryHost::with_files([("a.lgt", src)]);
        let (result, _) = run(&host, &[], &convert(EntityKind::Object, EntityKind::Category));
        let outcome = result.unwrap();
        assert_eq!(
            host.text("a.lgt").unwrap(),
            ":- category(cache,\n\timplements(p)).\n\n\tfoo.\n\n:- end_category.\n"
        );
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[test]
    fn protocols_cannot_hold_clauses() {
        let host = MemoryHost::with_files([("a.lgt", object("\tfoo."))]);
        let (result, _) = run(&host, &[], &convert(EntityKind::Object, EntityKind::Protocol));
        assert!(matches!(result, Err(RefactorError::Precondition(_))));
    }
}

// ============================================================================
// Clause-local refactorings
// ============================================================================

mod clause_scenarios {
    use super::*;

    #[test]
    fn inline_variable() {
        let host = MemoryHost::with_files([("a.lgt", object("\tfoo(X, Z) :-\n\t\tY = X + 1,\n\t\tZ is Y * 2."))]);
        let action = RefactorAction::InlineVariable(VariableTarget {
            uri: "a.lgt".into(),
            position: point(3, 2),
            variable: "Y".into(),
        });
        let (result, _) = run(&host, &[], &action);
        result.unwrap();
        assert_eq!(host.text("a.lgt").unwrap(), object("\tfoo(X, Z) :-\n\t\tZ is (X + 1) * 2."));
    }

    #[test]
    fn unify_with_new_variable() {
        let host = MemoryHost::with_files([("a.lgt", object("\tarea(R, A) :-\n\t\tA is 3.14159 * R * R."))]);
        let action = RefactorAction::UnifyWithNewVariable(SelectionTarget {
            uri: "a.lgt".into(),
            range: Range::new(point(3, 7), point(3, 14)),
        });
        let (result, _) = run(&host, &["Pi"], &action);
        result.unwrap();
        assert_eq!(
            host.text("a.lgt").unwrap(),
            object("\tarea(R, A) :-\n\t\tPi = 3.14159,\n\t\tA is Pi * R * R.")
        );
    }

    #[test]
    fn increment_numbered_variables() {
        let host = MemoryHost::with_files([("a.lgt", object("\tp(S0, S) :- q(S0, S1), r(S1, S)."))]);
        let action = RefactorAction::IncrementNumberedVariables(VariableTarget {
            uri: "a.lgt".into(),
            position: point(2, 20),
            variable: "S1".into(),
        });
        let (result, _) = run(&host, &[], &action);
        result.unwrap();
        assert_eq!(host.text("a.lgt").unwrap(), object("\tp(S0, S) :- q(S0, S2), r(S2, S)."));
    }

    #[test]
    fn replace_magic_number() {
        let host = MemoryHost::with_files([("a.lgt", object("\tarea(R, A) :-\n\t\tA is 3.14159 * R * R."))]);
        let action = RefactorAction::ReplaceMagicNumber(NumberTarget {
            uri: "a.lgt".into(),
            position: point(3, 7),
            number: "3.14159".into(),
        });
        let (result, _) = run(&host, &["pi", ""], &action);
        result.unwrap();
        assert_eq!(
            host.text("a.lgt").unwrap(),
            object("\tpi(3.14159).\n\n\tarea(R, A) :-\n\t\tpi(Pi),\n\t\tA is Pi * R * R.")
        );
    }
}

// ============================================================================
// Directives
// ============================================================================

mod directive_scenarios {
    use super::*;

    fn directive(name: &str) -> DirectiveTarget {
        DirectiveTarget {
            uri: "a.lgt".into(),
            line: 2,
            directive: name.into(),
        }
    }

    #[test]
    fn split_list_directive() {
        let host = MemoryHost::with_files([("a.lgt", object("\t:- public([foo/1, bar/2])."))]);
        let (result, _) = run(&host, &[], &RefactorAction::SplitListDirective(directive("public")));
        result.unwrap();
        assert_eq!(
            host.text("a.lgt").unwrap(),
            object("\t:- public(foo/1).\n\t:- public(bar/2).")
        );
    }

    #[test]
    fn sort_list_directive() {
        let host = MemoryHost::with_files([("a.lgt", object("\t:- uses(list, [member/2, Append/3, last/2])."))]);
        let (result, _) = run(&host, &[], &RefactorAction::SortListDirective(directive("uses")));
        result.unwrap();
        assert_eq!(
            host.text("a.lgt").unwrap(),
            object("\t:- uses(list, [Append/3, last/2, member/2]).")
        );
    }

    #[test]
    fn include_file_contents_tries_extensions() {
        let host = MemoryHost::with_files([
            ("a.lgt", object("\t:- include(defs).")),
            ("defs.lgt", "foo(1).\nfoo(2).\n".to_string()),
        ]);
        let (result, _) = run(&host, &[], &RefactorAction::IncludeFileContents(directive("include")));
        result.unwrap();
        assert_eq!(host.text("a.lgt").unwrap(), object("\tfoo(1).\n\tfoo(2)."));
    }

    #[test]
    fn missing_include_is_a_precondition_failure() {
        let host = MemoryHost::with_files([("a.lgt", object("\t:- include(nowhere)."))]);
        let (result, ui) = run(&host, &[], &RefactorAction::IncludeFileContents(directive("include")));
        assert!(matches!(result, Err(RefactorError::Precondition(_))));
        assert!(ui.messages().iter().any(|(l, _)| *l == MessageLevel::Error));
    }

    #[test]
    fn replace_with_include() {
        let host = MemoryHost::with_files([("a.lgt", object("\tfoo(1).\n\tfoo(2)."))]);
        let action = RefactorAction::ReplaceWithInclude(SelectionTarget {
            uri: "a.lgt".into(),
            range: lines(2, 4),
        });
        let (result, _) = run(&host, &["defs"], &action);
        result.unwrap();
        assert_eq!(host.text("defs.lgt").unwrap(), "foo(1).\nfoo(2).\n");
        assert_eq!(host.text("a.lgt").unwrap(), object("\t:- include('defs.lgt')."));
    }
}

// ============================================================================
// Detection round trip
// ============================================================================

#[test]
fn detected_action_executes_from_its_arguments() {
    let host = MemoryHost::with_files([("a.lgt", object("\t:- dynamic([zeta/1, alpha/0])."))]);
    let index = TextIndex::new(&host);
    let ui = ScriptedAdapter::new(Vec::<String>::new());
    let engine = Engine::new(&host, &index, &ui);
    let actions = engine.detect("a.lgt", Range::point(point(2, 6))).unwrap();
    let sort = actions
        .iter()
        .find(|a| a.command == "logtalk.refactor.sortListDirective")
        .unwrap();
    let action = RefactorAction::from_arguments(&sort.arguments).unwrap();
    engine.execute(&action).unwrap();
    assert_eq!(host.text("a.lgt").unwrap(), object("\t:- dynamic([alpha/0, zeta/1])."));
}

#[test]
fn file_system_host_writes_new_and_changed_files() {
    use retalk_core::config::WorkspaceConfig;
    use retalk_core::workspace::FsHost;

    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(dir.path().join("a.lgt"), object("\tfoo(1).\n\tfoo(2).")).unwrap();
    let host = FsHost::new(dir.path(), &WorkspaceConfig::default()).unwrap();
    let index = TextIndex::new(&host);
    let ui = ScriptedAdapter::new(["facts.lgt"]);
    let action = RefactorAction::ReplaceWithInclude(SelectionTarget {
        uri: "a.lgt".into(),
        range: lines(2, 4),
    });
    Engine::new(&host, &index, &ui).execute(&action).unwrap();
    assert_eq!(
        std::fs::read_to_string(dir.path().join("facts.lgt")).unwrap(),
        "foo(1).\nfoo(2).\n"
    );
    assert_eq!(
        std::fs::read_to_string(dir.path().join("a.lgt")).unwrap(),
        object("\t:- include('facts.lgt').")
    );
}
