//! Integration tests for the jackc compiler.
//!
//! Exercises the public API end to end: exact VM output for the core
//! language constructs, the XML parse-trace mode, error reporting, and the
//! file-system behavior around output artifacts.

use jackc::{
    CompileOptions, OutputMode, compile_directory, compile_file, compile_file_with_options,
    compile_source, compile_source_with_options, write_result,
};
use pretty_assertions::assert_eq;
use std::fs;

fn xml_options() -> CompileOptions {
    CompileOptions {
        mode: OutputMode::Xml,
    }
}

// =============================================================================
// Exact VM output
// =============================================================================

#[test]
fn test_constant_return_program() {
    let result = compile_source("class Main { function void main() { return; } }", "Main");
    assert!(result.is_ok(), "errors: {:?}", result.error);
    assert_eq!(
        result.output,
        "function Main.main 0\npush constant 0\nreturn\n"
    );
}

#[test]
fn test_point_constructor_program() {
    let source = "\
class Point { field int x, y;
  constructor Point new(int ax, int ay) {
    let x = ax; let y = ay; return this;
  }
}";
    let result = compile_source(source, "Point");
    assert!(result.is_ok(), "errors: {:?}", result.error);
    let expected = "\
function Point.new 0
push constant 2
call Memory.alloc 1
pop pointer 0
push argument 0
pop this 0
push argument 1
pop this 1
push pointer 0
return
";
    assert_eq!(result.output, expected);
}

#[test]
fn test_seven_style_program() {
    let source = "\
class Main {
    function void main() {
        do Output.printInt(1 + (2 * 3));
        return;
    }
}";
    let result = compile_source(source, "Main");
    assert!(result.is_ok());
    let expected = "\
function Main.main 0
push constant 1
push constant 2
push constant 3
call Math.multiply 2
add
call Output.printInt 1
pop temp 0
push constant 0
return
";
    assert_eq!(result.output, expected);
}

#[test]
fn test_control_flow_labels_are_matched() {
    let source = "\
class Main {
    function int main() {
        var int i, sum;
        let i = 0;
        let sum = 0;
        while (i < 10) {
            if (i > 5) { let sum = sum + i; } else { let sum = sum + 1; }
            let i = i + 1;
        }
        return sum;
    }
}";
    let result = compile_source(source, "Main");
    assert!(result.is_ok());
    let vm = &result.output;

    for label in [
        "LOOP_BRANCH.1",
        "BREAK_BRANCH.1",
        "ELSE_BRANCH.2",
        "END_BRANCH.2",
    ] {
        assert_eq!(
            vm.matches(&format!("label {}\n", label)).count(),
            1,
            "label {} should be defined exactly once",
            label
        );
    }
    // Loop shape: the backward goto comes after the conditional exit.
    let if_goto = vm.find("if-goto BREAK_BRANCH.1").unwrap();
    let goto = vm.find("goto LOOP_BRANCH.1").unwrap();
    assert!(vm.find("label LOOP_BRANCH.1").unwrap() < if_goto);
    assert!(if_goto < goto);
}

#[test]
fn test_object_oriented_program() {
    let source = "\
class Game {
    field Board board;
    static int games;

    constructor Game new() {
        let board = Board.new(16);
        let games = games + 1;
        return this;
    }

    method void step(int count) {
        do board.update(count);
        do draw();
        return;
    }

    method void draw() {
        return;
    }
}";
    let result = compile_source(source, "Game");
    assert!(result.is_ok(), "errors: {:?}", result.error);
    let vm = &result.output;

    // Constructor allocates one word for the single field.
    assert!(vm.contains("function Game.new 0\npush constant 1\ncall Memory.alloc 1\npop pointer 0"));
    // Static variable lives in the static segment.
    assert!(vm.contains("push static 0"));
    assert!(vm.contains("pop static 0"));
    // Method prologue binds the receiver.
    assert!(vm.contains("function Game.step 0\npush argument 0\npop pointer 0"));
    // Method call on a field: receiver pushed, count includes it.
    assert!(vm.contains("push this 0\npush argument 1\ncall Board.update 2"));
    // Method call on self.
    assert!(vm.contains("push pointer 0\ncall Game.draw 1"));
}

#[test]
fn test_array_and_string_program() {
    let source = "\
class Main {
    function void main() {
        var Array a;
        var int i;
        let a = Array.new(3);
        let a[0] = 10;
        let i = a[0];
        do Output.printString(\"ok\");
        return;
    }
}";
    let result = compile_source(source, "Main");
    assert!(result.is_ok());
    let vm = &result.output;

    assert!(vm.contains("call Array.new 1"));
    // Element write goes through temp 0 and pointer 1.
    assert!(vm.contains("pop temp 0\npop pointer 1\npush temp 0\npop that 0"));
    // Element read aligns `that` and pushes from it.
    assert!(vm.contains("pop pointer 1\npush that 0"));
    assert!(vm.contains("call String.new 1"));
    assert_eq!(vm.matches("call String.appendChar 2").count(), 2);
}

#[test]
fn test_compiling_twice_is_byte_identical() {
    let source = "\
class Main {
    function void main() {
        var int i;
        while (i < 3) { let i = i + 1; }
        do Output.printInt(i);
        return;
    }
}";
    let first = compile_source(source, "Main");
    let second = compile_source(source, "Main");
    assert!(first.is_ok());
    assert_eq!(first.output, second.output);
}

// =============================================================================
// XML mode
// =============================================================================

#[test]
fn test_xml_mode_emits_parse_trace() {
    let source = "class Main { function void main() { return; } }";
    let result = compile_source_with_options(source, "Main", xml_options());
    assert!(result.is_ok());
    let expected = "\
<class>
  <keyword> class </keyword>
  <identifier> Main </identifier>
  <symbol> { </symbol>
  <subroutineDec>
    <keyword> function </keyword>
    <keyword> void </keyword>
    <identifier> main </identifier>
    <symbol> ( </symbol>
    <parameterList>
    </parameterList>
    <symbol> ) </symbol>
    <subroutineBody>
      <symbol> { </symbol>
      <statements>
        <returnStatement>
          <keyword> return </keyword>
          <symbol> ; </symbol>
        </returnStatement>
      </statements>
      <symbol> } </symbol>
    </subroutineBody>
  </subroutineDec>
  <symbol> } </symbol>
</class>
";
    assert_eq!(result.output, expected);
}

#[test]
fn test_xml_mode_escapes_special_characters() {
    let source = "\
class Main { function void main() {
  var int i;
  if ((i < 1) & (i > 0)) { let i = 0; }
  return;
} }";
    let result = compile_source_with_options(source, "Main", xml_options());
    assert!(result.is_ok());
    assert!(result.output.contains("<symbol> &lt; </symbol>"));
    assert!(result.output.contains("<symbol> &gt; </symbol>"));
    assert!(result.output.contains("<symbol> &amp; </symbol>"));
}

// =============================================================================
// Error handling
// =============================================================================

#[test]
fn test_undeclared_variable_reports_position() {
    let source = "\
class Main {
    function void main() {
        let z = 1;
        return;
    }
}";
    let result = compile_source(source, "Main");
    assert!(!result.is_ok());
    assert!(result.output.is_empty());

    let report = result.report().unwrap();
    let expected = "\
Error found:
  Class 'Main', line 3
            let z = 1;
                ^
VariableError: undeclared variable 'z'
";
    assert_eq!(report, expected);
}

#[test]
fn test_syntax_error_mentions_expected_token() {
    let result = compile_source("class Main { function void main() { return }", "Main");
    assert!(!result.is_ok());
    let message = result.error.as_ref().unwrap().to_string();
    assert!(message.contains("expected"), "got: {}", message);
}

#[test]
fn test_lexical_error_unclosed_string() {
    let source = "class Main { function void main() { do Output.printString(\"oops); return; } }";
    let result = compile_source(source, "Main");
    assert!(!result.is_ok());
    assert!(
        result
            .error
            .as_ref()
            .unwrap()
            .to_string()
            .contains("unclosed string")
    );
}

#[test]
fn test_class_name_mismatch() {
    let result = compile_source("class Square {}", "Main");
    assert!(!result.is_ok());
    let report = result.report().unwrap();
    assert!(report.contains("ClassError: class name must match file name"));
}

// =============================================================================
// File-system behavior
// =============================================================================

#[test]
fn test_compile_file_and_write_result() {
    let dir = tempfile::tempdir().unwrap();
    let jack_path = dir.path().join("Main.jack");
    fs::write(
        &jack_path,
        "class Main { function void main() { return; } }",
    )
    .unwrap();

    let result = compile_file(&jack_path);
    assert!(result.is_ok());
    assert_eq!(result.filename, "Main");

    write_result(&result, dir.path()).unwrap();
    let vm = fs::read_to_string(dir.path().join("Main.vm")).unwrap();
    assert_eq!(vm, "function Main.main 0\npush constant 0\nreturn\n");
}

#[test]
fn test_failed_compile_removes_stale_output() {
    let dir = tempfile::tempdir().unwrap();
    let jack_path = dir.path().join("Main.jack");
    let vm_path = dir.path().join("Main.vm");

    // A previous successful run left an artifact behind.
    fs::write(&vm_path, "function Main.main 0\n").unwrap();
    // The source has since acquired an error.
    fs::write(
        &jack_path,
        "class Main { function void main() { let z = 1; return; } }",
    )
    .unwrap();

    let result = compile_file(&jack_path);
    assert!(!result.is_ok());
    write_result(&result, dir.path()).unwrap();
    assert!(!vm_path.exists(), "stale Main.vm should have been removed");
}

#[test]
fn test_failed_compile_with_no_stale_output_is_fine() {
    let dir = tempfile::tempdir().unwrap();
    let jack_path = dir.path().join("Main.jack");
    fs::write(&jack_path, "class Main { let").unwrap();

    let result = compile_file(&jack_path);
    assert!(!result.is_ok());
    write_result(&result, dir.path()).unwrap();
    assert!(!dir.path().join("Main.vm").exists());
}

#[test]
fn test_xml_mode_writes_xml_extension() {
    let dir = tempfile::tempdir().unwrap();
    let jack_path = dir.path().join("Main.jack");
    fs::write(&jack_path, "class Main {}").unwrap();

    let result = compile_file_with_options(&jack_path, xml_options());
    assert!(result.is_ok());
    write_result(&result, dir.path()).unwrap();
    assert!(dir.path().join("Main.xml").exists());
    assert!(!dir.path().join("Main.vm").exists());
}

#[test]
fn test_directory_compilation_is_per_file_independent() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("Good.jack"),
        "class Good { function void main() { return; } }",
    )
    .unwrap();
    fs::write(
        dir.path().join("Bad.jack"),
        "class Bad { function void main() { let z = 1; return; } }",
    )
    .unwrap();

    let results = compile_directory(dir.path());
    assert_eq!(results.len(), 2);

    let good = results.iter().find(|r| r.filename == "Good").unwrap();
    let bad = results.iter().find(|r| r.filename == "Bad").unwrap();
    assert!(good.is_ok());
    assert!(good.output.contains("function Good.main 0"));
    assert!(!bad.is_ok());

    for result in &results {
        write_result(result, dir.path()).unwrap();
    }
    assert!(dir.path().join("Good.vm").exists());
    assert!(!dir.path().join("Bad.vm").exists());
}

#[test]
fn test_directory_compilation_skips_non_jack_files() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("Main.jack"), "class Main {}").unwrap();
    fs::write(dir.path().join("notes.txt"), "not a source file").unwrap();
    fs::create_dir(dir.path().join("nested")).unwrap();
    fs::write(
        dir.path().join("nested").join("Deep.jack"),
        "class Deep {}",
    )
    .unwrap();

    let results = compile_directory(dir.path());
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].filename, "Main");
}

#[test]
fn test_empty_directory_yields_no_results() {
    let dir = tempfile::tempdir().unwrap();
    assert!(compile_directory(dir.path()).is_empty());
}

#[test]
fn test_missing_file_reports_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = compile_file(&dir.path().join("Absent.jack"));
    assert!(!result.is_ok());
    assert!(result.error.as_ref().unwrap().to_string().contains("IO error"));
}
