//! Compilation engine: recursive descent over the Jack grammar with
//! embedded code generation.
//!
//! The engine pulls tokens on demand, keeps the two-scope symbol table
//! current, and pushes output through the [`Writer`] sink as it goes. There
//! is no syntax tree; each grammar production emits its translation while
//! it parses. The same traversal serves both sinks: terminal and block
//! calls feed the XML trace, instruction calls feed the VM text, and each
//! sink ignores the other family.

use crate::error::{CompileError, ErrorKind};
use crate::symbol_table::{Symbol, SymbolKind, SymbolTable};
use crate::token::{Keyword, Span, Token};
use crate::tokenizer::Tokenizer;
use crate::writer::Writer;

/// Single-pass compiler for one Jack source file.
pub struct CompilationEngine<'w, W: Writer> {
    tokenizer: Tokenizer,
    symbols: SymbolTable,
    writer: &'w mut W,
    /// The class name expected from the file name, confirmed at the
    /// `class` header and used to qualify emitted function names.
    class_name: String,
    /// Mints fresh `if`/`while` label pairs, unique within the class.
    branch_count: u32,
}

impl<'w, W: Writer> CompilationEngine<'w, W> {
    /// Create an engine for one source file. `class_name` is the file's
    /// basename; the class declared in the source must match it.
    pub fn new(source: &str, class_name: &str, writer: &'w mut W) -> Self {
        Self {
            tokenizer: Tokenizer::new(source),
            symbols: SymbolTable::new(),
            writer,
            class_name: class_name.to_string(),
            branch_count: 0,
        }
    }

    /// Compile the whole translation unit. The first error aborts.
    pub fn compile(mut self) -> Result<(), CompileError> {
        self.tokenizer.advance()?;
        if self.tokenizer.current().is_some() {
            self.compile_class()?;
            if self.tokenizer.current().is_some() {
                return Err(CompileError::syntax(
                    self.tokenizer.span(),
                    "all code should be within a single class block",
                ));
            }
        }
        Ok(())
    }

    // ========================================================================
    // Token helpers
    // ========================================================================

    fn token(&self) -> Option<&Token> {
        self.tokenizer.current().map(|t| &t.token)
    }

    fn keyword(&self) -> Option<Keyword> {
        match self.token() {
            Some(Token::Keyword(k)) => Some(*k),
            _ => None,
        }
    }

    fn at_keyword(&self, keyword: Keyword) -> bool {
        self.keyword() == Some(keyword)
    }

    fn at_symbol(&self, symbol: char) -> bool {
        matches!(self.token(), Some(Token::Symbol(c)) if *c == symbol)
    }

    /// The current token, or an end-of-file error at the current position.
    fn require_token(&self) -> Result<&Token, CompileError> {
        match self.token() {
            Some(token) => Ok(token),
            None => Err(CompileError::end_of_file(
                self.tokenizer.span(),
                "class block left unclosed",
            )),
        }
    }

    /// Consume the current token, writing it as a terminal of the trace.
    fn absorb(&mut self) -> Result<(), CompileError> {
        if let Some(spanned) = self.tokenizer.current() {
            let tag = spanned.token.tag();
            let text = spanned.token.text();
            self.writer.write_terminal(tag, &text);
        }
        self.tokenizer.advance()
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> Result<(), CompileError> {
        let token = self.require_token()?;
        if !matches!(token, Token::Keyword(k) if *k == keyword) {
            return Err(CompileError::syntax(
                self.tokenizer.span(),
                format!("expected '{}' but got {}", keyword.as_str(), token),
            ));
        }
        self.absorb()
    }

    fn expect_symbol(&mut self, symbol: char) -> Result<(), CompileError> {
        let token = self.require_token()?;
        if !matches!(token, Token::Symbol(c) if *c == symbol) {
            return Err(CompileError::syntax(
                self.tokenizer.span(),
                format!("expected '{}' but got {}", symbol, token),
            ));
        }
        self.absorb()
    }

    fn expect_identifier(&mut self) -> Result<String, CompileError> {
        let token = self.require_token()?;
        let Token::Identifier(name) = token else {
            return Err(CompileError::syntax(
                self.tokenizer.span(),
                format!("expected an identifier but got {}", token),
            ));
        };
        let name = name.clone();
        self.absorb()?;
        Ok(name)
    }

    /// 'int' | 'char' | 'boolean' | className
    fn expect_type(&mut self) -> Result<String, CompileError> {
        let token = self.require_token()?;
        let ty = match token {
            Token::Keyword(Keyword::Int | Keyword::Char | Keyword::Boolean) => token.text(),
            Token::Identifier(name) => name.clone(),
            other => {
                return Err(CompileError::syntax(
                    self.tokenizer.span(),
                    format!(
                        "expected a type keyword (int/char/boolean) or class name but got {}",
                        other
                    ),
                ));
            }
        };
        self.absorb()?;
        Ok(ty)
    }

    /// 'void' | type
    fn expect_return_type(&mut self) -> Result<(), CompileError> {
        let token = self.require_token()?;
        match token {
            Token::Keyword(Keyword::Void | Keyword::Int | Keyword::Char | Keyword::Boolean)
            | Token::Identifier(_) => self.absorb(),
            other => Err(CompileError::syntax(
                self.tokenizer.span(),
                format!(
                    "expected a return type (void/int/char/boolean/class name) but got {}",
                    other
                ),
            )),
        }
    }

    fn starts_type(&self) -> bool {
        matches!(
            self.token(),
            Some(Token::Keyword(Keyword::Int | Keyword::Char | Keyword::Boolean))
                | Some(Token::Identifier(_))
        )
    }

    fn starts_term(&self) -> bool {
        matches!(
            self.token(),
            Some(
                Token::IntegerConstant(_)
                    | Token::StringConstant(_)
                    | Token::Identifier(_)
                    | Token::Keyword(
                        Keyword::True | Keyword::False | Keyword::Null | Keyword::This
                    )
                    | Token::Symbol('(' | '-' | '~')
            )
        )
    }

    fn binary_op(&self) -> Option<char> {
        match self.token() {
            Some(Token::Symbol(c)) if "+-*/&|<>=".contains(*c) => Some(*c),
            _ => None,
        }
    }

    // ========================================================================
    // Symbol helpers
    // ========================================================================

    /// Define a symbol. Duplicates are an error only when generating code;
    /// the parse trace keeps the first definition and moves on.
    fn define(
        &mut self,
        name: &str,
        ty: &str,
        kind: SymbolKind,
        span: Span,
    ) -> Result<(), CompileError> {
        match self.symbols.define(name, ty, kind, span) {
            Err(e) if W::GENERATES_CODE => Err(e),
            _ => Ok(()),
        }
    }

    /// type varName (',' varName)* — defines each name under `kind`.
    fn compile_name_list(&mut self, ty: &str, kind: SymbolKind) -> Result<(), CompileError> {
        let span = self.tokenizer.span();
        let name = self.expect_identifier()?;
        self.define(&name, ty, kind, span)?;
        while self.at_symbol(',') {
            self.absorb()?;
            let span = self.tokenizer.span();
            let name = self.expect_identifier()?;
            self.define(&name, ty, kind, span)?;
        }
        Ok(())
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    /// class: 'class' className '{' classVarDec* subroutineDec* '}'
    fn compile_class(&mut self) -> Result<(), CompileError> {
        self.writer.open_block("class");

        self.expect_keyword(Keyword::Class)?;
        let name_span = self.tokenizer.span();
        let name = self.expect_identifier()?;
        if name != self.class_name {
            return Err(CompileError::source(
                ErrorKind::Class,
                name_span,
                "class name must match file name",
            ));
        }
        self.expect_symbol('{')?;

        while let Some(kind @ (Keyword::Static | Keyword::Field)) = self.keyword() {
            self.compile_class_var_dec(kind)?;
        }
        while let Some(kind @ (Keyword::Constructor | Keyword::Function | Keyword::Method)) =
            self.keyword()
        {
            self.compile_subroutine_dec(kind)?;
        }

        self.expect_symbol('}')?;
        self.writer.close_block("class");
        Ok(())
    }

    /// classVarDec: ('static' | 'field') type varName (',' varName)* ';'
    fn compile_class_var_dec(&mut self, keyword: Keyword) -> Result<(), CompileError> {
        self.writer.open_block("classVarDec");

        let kind = if keyword == Keyword::Static {
            SymbolKind::Static
        } else {
            SymbolKind::Field
        };
        self.absorb()?;
        let ty = self.expect_type()?;
        self.compile_name_list(&ty, kind)?;
        self.expect_symbol(';')?;

        self.writer.close_block("classVarDec");
        Ok(())
    }

    /// subroutineDec: ('constructor' | 'function' | 'method')
    ///                ('void' | type) subroutineName
    ///                '(' parameterList ')' subroutineBody
    fn compile_subroutine_dec(&mut self, kind: Keyword) -> Result<(), CompileError> {
        self.writer.open_block("subroutineDec");
        self.symbols.start_subroutine();

        self.absorb()?; // constructor | function | method
        self.expect_return_type()?;
        let name = self.expect_identifier()?;
        let full_name = format!("{}.{}", self.class_name, name);

        // A method receives the current object as argument 0, so user
        // arguments start at index 1.
        if kind == Keyword::Method {
            let class_name = self.class_name.clone();
            self.define(
                "this",
                &class_name,
                SymbolKind::Argument,
                self.tokenizer.span(),
            )?;
        }

        self.expect_symbol('(')?;
        self.compile_parameter_list()?;
        self.expect_symbol(')')?;

        // subroutineBody: '{' varDec* statements '}'
        self.writer.open_block("subroutineBody");
        self.expect_symbol('{')?;
        while self.at_keyword(Keyword::Var) {
            self.compile_var_dec()?;
        }

        // The local count is only known once every varDec is consumed; the
        // function directive must not go out before this point.
        self.writer
            .write_function(&full_name, self.symbols.count(SymbolKind::Local));
        match kind {
            Keyword::Constructor => {
                // One word per field, then bind `this` to the fresh object.
                self.writer
                    .write_push("constant", self.symbols.count(SymbolKind::Field));
                self.writer.write_call("Memory.alloc", 1);
                self.writer.write_pop("pointer", 0);
            }
            Keyword::Method => {
                // Bind `this` to the caller's object.
                self.writer.write_push("argument", 0);
                self.writer.write_pop("pointer", 0);
            }
            _ => {}
        }

        self.compile_statements()?;
        self.expect_symbol('}')?;
        self.writer.close_block("subroutineBody");

        self.writer.close_block("subroutineDec");
        Ok(())
    }

    /// parameterList: ((type varName) (',' type varName)*)?
    fn compile_parameter_list(&mut self) -> Result<(), CompileError> {
        self.writer.open_block("parameterList");

        if self.starts_type() {
            let ty = self.expect_type()?;
            let span = self.tokenizer.span();
            let name = self.expect_identifier()?;
            self.define(&name, &ty, SymbolKind::Argument, span)?;
            while self.at_symbol(',') {
                self.absorb()?;
                let ty = self.expect_type()?;
                let span = self.tokenizer.span();
                let name = self.expect_identifier()?;
                self.define(&name, &ty, SymbolKind::Argument, span)?;
            }
        }

        self.writer.close_block("parameterList");
        Ok(())
    }

    /// varDec: 'var' type varName (',' varName)* ';'
    fn compile_var_dec(&mut self) -> Result<(), CompileError> {
        self.writer.open_block("varDec");

        self.absorb()?; // 'var'
        let ty = self.expect_type()?;
        self.compile_name_list(&ty, SymbolKind::Local)?;
        self.expect_symbol(';')?;

        self.writer.close_block("varDec");
        Ok(())
    }

    // ========================================================================
    // Statements
    // ========================================================================

    /// statements: (letStatement | ifStatement | whileStatement
    ///              | doStatement | returnStatement)*
    fn compile_statements(&mut self) -> Result<(), CompileError> {
        self.writer.open_block("statements");

        loop {
            match self.keyword() {
                Some(Keyword::Let) => self.compile_let()?,
                Some(Keyword::If) => self.compile_if()?,
                Some(Keyword::While) => self.compile_while()?,
                Some(Keyword::Do) => self.compile_do()?,
                Some(Keyword::Return) => self.compile_return()?,
                _ => break,
            }
        }

        self.writer.close_block("statements");
        Ok(())
    }

    /// letStatement: 'let' varName ('[' expression ']')? '=' expression ';'
    fn compile_let(&mut self) -> Result<(), CompileError> {
        self.writer.open_block("letStatement");

        self.absorb()?; // 'let'
        let var_span = self.tokenizer.span();
        let name = self.expect_identifier()?;
        let symbol = self.resolve(&name, var_span)?;

        if self.at_symbol('[') {
            if W::GENERATES_CODE
                && let Some(s) = &symbol
                && s.ty != "Array"
            {
                return Err(CompileError::source(
                    ErrorKind::Array,
                    var_span,
                    format!("'{}' is not an array", name),
                ));
            }
            self.absorb()?; // '['
            if let Some(s) = &symbol {
                self.writer.write_push(s.segment(), s.index);
            }
            self.compile_expression()?;
            self.writer.write_arithmetic("add");
            self.expect_symbol(']')?;
            self.expect_symbol('=')?;
            self.compile_expression()?;
            // The target address is below the RHS on the stack, so park the
            // RHS in temp 0 before aligning `that`.
            self.writer.write_pop("temp", 0);
            self.writer.write_pop("pointer", 1);
            self.writer.write_push("temp", 0);
            self.writer.write_pop("that", 0);
        } else {
            self.expect_symbol('=')?;
            self.compile_expression()?;
            if let Some(s) = &symbol {
                self.writer.write_pop(s.segment(), s.index);
            }
        }

        self.expect_symbol(';')?;
        self.writer.close_block("letStatement");
        Ok(())
    }

    /// ifStatement: 'if' '(' expression ')' '{' statements '}'
    ///              ('else' '{' statements '}')?
    fn compile_if(&mut self) -> Result<(), CompileError> {
        self.writer.open_block("ifStatement");

        self.absorb()?; // 'if'
        self.branch_count += 1;
        let else_label = format!("ELSE_BRANCH.{}", self.branch_count);
        let end_label = format!("END_BRANCH.{}", self.branch_count);

        self.expect_symbol('(')?;
        self.compile_expression()?;
        self.expect_symbol(')')?;
        self.writer.write_arithmetic("not");
        self.writer.write_if_goto(&else_label);

        self.expect_symbol('{')?;
        self.compile_statements()?;
        self.expect_symbol('}')?;
        self.writer.write_goto(&end_label);
        self.writer.write_label(&else_label);

        if self.at_keyword(Keyword::Else) {
            self.absorb()?;
            self.expect_symbol('{')?;
            self.compile_statements()?;
            self.expect_symbol('}')?;
        }
        self.writer.write_label(&end_label);

        self.writer.close_block("ifStatement");
        Ok(())
    }

    /// whileStatement: 'while' '(' expression ')' '{' statements '}'
    fn compile_while(&mut self) -> Result<(), CompileError> {
        self.writer.open_block("whileStatement");

        self.absorb()?; // 'while'
        self.branch_count += 1;
        let loop_label = format!("LOOP_BRANCH.{}", self.branch_count);
        let break_label = format!("BREAK_BRANCH.{}", self.branch_count);

        self.writer.write_label(&loop_label);
        self.expect_symbol('(')?;
        self.compile_expression()?;
        self.expect_symbol(')')?;
        self.writer.write_arithmetic("not");
        self.writer.write_if_goto(&break_label);

        self.expect_symbol('{')?;
        self.compile_statements()?;
        self.expect_symbol('}')?;
        self.writer.write_goto(&loop_label);
        self.writer.write_label(&break_label);

        self.writer.close_block("whileStatement");
        Ok(())
    }

    /// doStatement: 'do' subroutineCall ';'
    fn compile_do(&mut self) -> Result<(), CompileError> {
        self.writer.open_block("doStatement");

        self.absorb()?; // 'do'
        let call_span = self.tokenizer.span();
        let name = self.expect_identifier()?;
        if !self.compile_subroutine_call(&name)? {
            return Err(CompileError::source(
                ErrorKind::Subroutine,
                call_span,
                "expected subroutine call",
            ));
        }
        // A do statement discards the call's return value.
        self.writer.write_pop("temp", 0);
        self.expect_symbol(';')?;

        self.writer.close_block("doStatement");
        Ok(())
    }

    /// returnStatement: 'return' expression? ';'
    fn compile_return(&mut self) -> Result<(), CompileError> {
        self.writer.open_block("returnStatement");

        self.absorb()?; // 'return'
        if self.at_symbol(';') {
            // Void subroutines still leave a value for the caller to drop.
            self.writer.write_push("constant", 0);
        } else {
            self.compile_expression()?;
        }
        self.writer.write_return();
        self.expect_symbol(';')?;

        self.writer.close_block("returnStatement");
        Ok(())
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    /// expression: term (op term)*
    ///
    /// All binary operators share one precedence level and associate left
    /// to right; that is the language definition, not a shortcut.
    fn compile_expression(&mut self) -> Result<(), CompileError> {
        self.writer.open_block("expression");

        self.compile_term()?;
        while let Some(op) = self.binary_op() {
            self.absorb()?;
            self.compile_term()?;
            match op {
                '*' => self.writer.write_call("Math.multiply", 2),
                '/' => self.writer.write_call("Math.divide", 2),
                '+' => self.writer.write_arithmetic("add"),
                '-' => self.writer.write_arithmetic("sub"),
                '&' => self.writer.write_arithmetic("and"),
                '|' => self.writer.write_arithmetic("or"),
                '<' => self.writer.write_arithmetic("lt"),
                '>' => self.writer.write_arithmetic("gt"),
                _ => self.writer.write_arithmetic("eq"),
            }
        }

        self.writer.close_block("expression");
        Ok(())
    }

    /// term: integerConstant | stringConstant | keywordConstant | varName
    ///     | varName '[' expression ']' | subroutineCall
    ///     | '(' expression ')' | unaryOp term
    fn compile_term(&mut self) -> Result<(), CompileError> {
        self.writer.open_block("term");

        let span = self.tokenizer.span();
        let token = self.require_token()?.clone();
        match token {
            Token::IntegerConstant(n) => {
                self.absorb()?;
                self.writer.write_push("constant", n);
            }
            Token::StringConstant(s) => {
                self.absorb()?;
                self.compile_string_constant(&s);
            }
            Token::Keyword(Keyword::True) => {
                self.absorb()?;
                self.writer.write_push("constant", 0);
                self.writer.write_arithmetic("not");
            }
            Token::Keyword(Keyword::False | Keyword::Null) => {
                self.absorb()?;
                self.writer.write_push("constant", 0);
            }
            Token::Keyword(Keyword::This) => {
                self.absorb()?;
                self.writer.write_push("pointer", 0);
            }
            Token::Identifier(name) => {
                self.absorb()?;
                if !self.compile_subroutine_call(&name)? {
                    self.compile_variable_access(&name, span)?;
                }
            }
            Token::Symbol('(') => {
                self.absorb()?;
                self.compile_expression()?;
                self.expect_symbol(')')?;
            }
            Token::Symbol('-') => {
                self.absorb()?;
                self.compile_term()?;
                self.writer.write_arithmetic("neg");
            }
            Token::Symbol('~') => {
                self.absorb()?;
                self.compile_term()?;
                self.writer.write_arithmetic("not");
            }
            other => {
                return Err(CompileError::syntax(
                    span,
                    format!("expected an expression term but got {}", other),
                ));
            }
        }

        self.writer.close_block("term");
        Ok(())
    }

    /// varName | varName '[' expression ']', after the name was consumed.
    fn compile_variable_access(&mut self, name: &str, span: Span) -> Result<(), CompileError> {
        let symbol = self.resolve(name, span)?;
        if let Some(s) = &symbol {
            self.writer.write_push(s.segment(), s.index);
        }

        if self.at_symbol('[') {
            if W::GENERATES_CODE
                && let Some(s) = &symbol
                && s.ty != "Array"
            {
                return Err(CompileError::source(
                    ErrorKind::Array,
                    span,
                    format!("'{}' is not an array", name),
                ));
            }
            self.absorb()?; // '['
            self.compile_expression()?;
            self.writer.write_arithmetic("add");
            // Aligning `that` with the element address lets the value come
            // off `that 0`.
            self.writer.write_pop("pointer", 1);
            self.writer.write_push("that", 0);
            self.expect_symbol(']')?;
        }
        Ok(())
    }

    /// Resolve a variable reference. Undeclared names are an error only
    /// when generating code.
    fn resolve(&self, name: &str, span: Span) -> Result<Option<Symbol>, CompileError> {
        match self.symbols.lookup(name) {
            Some(symbol) => Ok(Some(symbol.clone())),
            None if W::GENERATES_CODE => Err(CompileError::source(
                ErrorKind::Variable,
                span,
                format!("undeclared variable '{}'", name),
            )),
            None => Ok(None),
        }
    }

    /// subroutineCall: ((className | varName) '.')?
    ///                 subroutineName '(' expressionList ')'
    ///
    /// `name` has already been consumed. Returns false without consuming
    /// anything further when the tokens do not form a call.
    fn compile_subroutine_call(&mut self, name: &str) -> Result<bool, CompileError> {
        if self.at_symbol('.') {
            self.absorb()?; // '.'
            let subroutine = self.expect_identifier()?;
            // A receiver found in the symbol table is an object variable:
            // push it and dispatch on its type. Anything else is a class
            // name taken verbatim.
            let (callee, receiver_args) = match self.symbols.lookup(name).cloned() {
                Some(var) => {
                    self.writer.write_push(var.segment(), var.index);
                    (format!("{}.{}", var.ty, subroutine), 1)
                }
                None => (format!("{}.{}", name, subroutine), 0),
            };
            self.expect_symbol('(')?;
            let num_args = receiver_args + self.compile_expression_list()?;
            self.expect_symbol(')')?;
            self.writer.write_call(&callee, num_args);
            return Ok(true);
        }

        if self.at_symbol('(') {
            // No receiver: a method call on the current instance.
            let callee = format!("{}.{}", self.class_name, name);
            self.writer.write_push("pointer", 0);
            self.absorb()?; // '('
            let num_args = 1 + self.compile_expression_list()?;
            self.expect_symbol(')')?;
            self.writer.write_call(&callee, num_args);
            return Ok(true);
        }

        Ok(false)
    }

    /// expressionList: (expression (',' expression)*)? — returns the count.
    fn compile_expression_list(&mut self) -> Result<u16, CompileError> {
        self.writer.open_block("expressionList");

        let mut count = 0;
        if self.starts_term() {
            self.compile_expression()?;
            count += 1;
            while self.at_symbol(',') {
                self.absorb()?;
                self.compile_expression()?;
                count += 1;
            }
        }

        self.writer.close_block("expressionList");
        Ok(count)
    }

    /// A string constant builds a String object at runtime, one character
    /// at a time.
    fn compile_string_constant(&mut self, s: &str) {
        self.writer.write_push("constant", s.chars().count() as u16);
        self.writer.write_call("String.new", 1);
        for c in s.chars() {
            self.writer.write_push("constant", c as u16);
            // appendChar is a method: the receiver plus the character.
            self.writer.write_call("String.appendChar", 2);
        }
    }
}
