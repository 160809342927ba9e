// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! AST → chunks + function table (§4.C).

use crate::emit::Emitter;
use copl_core::class::Access as CoreAccess;
use copl_core::value::Cell;
use copl_core::{ClassDescriptor, Chunk, FunctionBody, FunctionDef, Opcode, Program};
use copl_parser::ast::{
    self, Access, BinOp, ClassDecl, Expr, FunctionDecl, IncDecOp, LValue, Program as AstProgram, Stmt,
    TypeExpr, UnOp,
};
use std::collections::HashMap;
use thiserror::Error;

/// An `import "path" as alias` recorded at compile time, re-resolved by
/// the VM when it executes the corresponding `LOAD_MODULE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleBinding {
    /// The alias bound to the module.
    pub alias: String,
    /// The bytecode file path, as written in source.
    pub path: String,
}

/// Everything the compiler produces from one source file.
#[derive(Debug, Clone)]
pub struct CompileOutput {
    /// The compiled function table.
    pub program: Program,
    /// Class descriptors, keyed by class name.
    pub classes: HashMap<String, ClassDescriptor>,
    /// Module bindings, in `import` order.
    pub modules: Vec<ModuleBinding>,
}

/// A failure encountered while lowering the AST.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompileError {
    /// A name wasn't found in any enclosing scope or the global table.
    #[error("unknown identifier '{0}'")]
    UnknownIdentifier(String),
    /// A direct call named a function that was never declared.
    #[error("unknown function '{0}'")]
    UnknownFunction(String),
    /// `new` named a class that was never declared.
    #[error("unknown class '{0}'")]
    UnknownClass(String),
    /// A member access named a field the class descriptor doesn't have.
    #[error("class '{class}' has no field '{field}'")]
    UnknownField {
        /// The class being accessed.
        class: String,
        /// The field name that wasn't found.
        field: String,
    },
    /// `a.b` where `a`'s type couldn't be determined at compile time.
    #[error("cannot resolve the type of a member-access target")]
    UnresolvedMemberTarget,
    /// `break` outside any enclosing loop.
    #[error("'break' outside a loop")]
    BreakOutsideLoop,
    /// `continue` outside any enclosing loop.
    #[error("'continue' outside a loop")]
    ContinueOutsideLoop,
    /// `this` referenced outside a method or constructor body.
    #[error("'this' used outside a method")]
    ThisOutsideMethod,
    /// Two classes declared the same name.
    #[error("duplicate class declaration '{0}'")]
    DuplicateClass(String),
}

const BUILTINS: &[(&str, u32)] = &[
    ("print", 1),
    ("println", 1),
    ("input", 1),
    ("debug", 1),
    ("append", 2),
    ("size", 1),
    ("str2int", 1),
    ("not_null", 1),
];
/// `read_file(path)`: a ninth builtin the original runtime implements
/// (`original_source/running/native_proc.hpp`) but `spec.md`'s builtin
/// surface list omits. Not excluded by any Non-goal, so it rides along.
const READ_FILE_BUILTIN: (&str, u32) = ("read_file", 1);

struct LoopLabels {
    break_label: crate::emit::Label,
    continue_label: crate::emit::Label,
}

struct Compiler {
    functions: Vec<FunctionDef>,
    function_ids: HashMap<String, u32>,
    next_func_id: u32,
    lambda_counter: u32,
    classes: HashMap<String, ClassDescriptor>,
    module_aliases: HashMap<String, String>,
    scopes: Vec<HashMap<String, String>>,
    current_class: Option<String>,
    current_function_id: u32,
    loops: Vec<LoopLabels>,
}

/// Compile a parsed source file into its function table, class
/// descriptors, and module bindings.
pub fn compile(ast: &AstProgram) -> Result<CompileOutput, CompileError> {
    let mut compiler = Compiler {
        functions: Vec::new(),
        function_ids: HashMap::new(),
        next_func_id: 0,
        lambda_counter: 0,
        classes: HashMap::new(),
        module_aliases: HashMap::new(),
        scopes: Vec::new(),
        current_class: None,
        current_function_id: 0,
        loops: Vec::new(),
    };

    for (name, arg_count) in BUILTINS.iter().chain(std::iter::once(&READ_FILE_BUILTIN)) {
        compiler.register_function(name, *arg_count, false, FunctionBody::Builtin);
    }

    let modules = ast
        .imports
        .iter()
        .map(|import| {
            compiler
                .module_aliases
                .insert(import.alias.clone(), import.path.clone());
            ModuleBinding {
                alias: import.alias.clone(),
                path: import.path.clone(),
            }
        })
        .collect();

    for class in &ast.classes {
        compiler.declare_class(class)?;
    }
    for class in &ast.classes {
        compiler.predeclare_methods(class);
    }
    for func in &ast.functions {
        compiler.predeclare_function(func);
    }

    for class in &ast.classes {
        compiler.compile_class(class)?;
    }
    for func in &ast.functions {
        compiler.compile_function(func)?;
    }

    let mut functions = compiler.functions;
    functions.sort_by_key(|f| f.id);

    Ok(CompileOutput {
        program: Program { functions },
        classes: compiler.classes,
        modules,
    })
}

fn type_to_string(ty: &TypeExpr) -> String {
    match ty {
        TypeExpr::Named(name) => name.clone(),
        TypeExpr::Array(inner) => format!("[{}]", type_to_string(inner)),
        TypeExpr::Lambda(_) => "lambda".to_string(),
    }
}

impl Compiler {
    fn register_function(&mut self, name: &str, arg_count: u32, is_lambda: bool, body: FunctionBody) -> u32 {
        let id = self.next_func_id;
        self.next_func_id += 1;
        self.function_ids.insert(name.to_string(), id);
        self.functions.push(FunctionDef {
            name: name.to_string(),
            id,
            arg_count,
            is_lambda,
            body,
        });
        id
    }

    fn declare_class(&mut self, class: &ClassDecl) -> Result<(), CompileError> {
        if self.classes.contains_key(&class.name) {
            return Err(CompileError::DuplicateClass(class.name.clone()));
        }
        let mut descriptor = ClassDescriptor::new(class.name.clone());
        for field in &class.fields {
            descriptor.declare_field(
                field.name.clone(),
                type_to_string(&field.ty),
                to_core_access(field.access),
            );
        }
        self.classes.insert(class.name.clone(), descriptor);
        Ok(())
    }

    fn predeclare_methods(&mut self, class: &ClassDecl) {
        for method in &class.methods {
            let name = method_symbol(&class.name, &method.name);
            // +1 for the implicit `this` every method and constructor
            // receives (§4.C: "method and constructor frames prepend an
            // implicit this parameter").
            let arg_count = method.params.len() as u32 + 1;
            self.register_function(&name, arg_count, false, placeholder_body());
        }
    }

    fn predeclare_function(&mut self, func: &FunctionDecl) {
        let arg_count = func.params.len() as u32;
        self.register_function(&func.name, arg_count, false, placeholder_body());
    }

    fn compile_class(&mut self, class: &ClassDecl) -> Result<(), CompileError> {
        for method in &class.methods {
            let symbol = method_symbol(&class.name, &method.name);
            let id = self.function_ids[&symbol];
            self.current_class = Some(class.name.clone());
            let chunk = self.compile_body(
                id,
                Some(class.name.clone()),
                &method.params,
                &method.body,
                &[],
            )?;
            self.current_class = None;
            self.replace_body(id, chunk);
        }
        Ok(())
    }

    fn compile_function(&mut self, func: &FunctionDecl) -> Result<(), CompileError> {
        let id = self.function_ids[&func.name];
        let modules: Vec<ModuleBinding> = if func.name == "main" {
            self.module_aliases
                .iter()
                .map(|(alias, path)| ModuleBinding {
                    alias: alias.clone(),
                    path: path.clone(),
                })
                .collect()
        } else {
            Vec::new()
        };
        let chunk = self.compile_body(id, None, &func.params, &func.body, &modules)?;
        self.replace_body(id, chunk);
        Ok(())
    }

    fn replace_body(&mut self, id: u32, chunk: Chunk) {
        let def = self.functions.iter_mut().find(|f| f.id == id).expect("registered");
        def.body = FunctionBody::Script(chunk);
    }

    fn compile_body(
        &mut self,
        id: u32,
        implicit_this: Option<String>,
        params: &[ast::Param],
        body: &[Stmt],
        modules: &[ModuleBinding],
    ) -> Result<Chunk, CompileError> {
        let previous_fn = self.current_function_id;
        self.current_function_id = id;

        let mut scope = HashMap::new();
        if let Some(class) = &implicit_this {
            scope.insert("this".to_string(), class.clone());
        }
        for param in params {
            scope.insert(param.name.clone(), type_to_string(&param.ty));
        }
        self.scopes.push(scope);

        let mut chunk = Chunk::new();
        let mut emitter = Emitter::new();

        // Parameter-binding prologue: the caller pushes arguments in
        // declared order and the `CALL`/`SPECIAL_CALL` transfer convention
        // hands them to the callee in that same order, so binding them
        // back to names is just a `SET_NAME` per declared parameter,
        // `this` first (`original_source/front/compiler.hpp`'s
        // `visit_func_node`).
        if implicit_this.is_some() {
            let idx = chunk.add_name("this");
            emitter.op_operand(Opcode::SetName, idx as i32);
        }
        for param in params {
            let idx = chunk.add_name(&param.name);
            emitter.op_operand(Opcode::SetName, idx as i32);
        }

        for module in modules {
            let path_idx = chunk.add_constant(Cell::Str(module.path.clone()));
            let alias_idx = chunk.add_constant(Cell::Str(module.alias.clone()));
            emitter.op_operand2(Opcode::LoadModule, path_idx as i32, alias_idx as i32);
        }

        for stmt in body {
            self.compile_stmt(stmt, &mut chunk, &mut emitter)?;
        }
        emitter.op(Opcode::Leave);

        self.scopes.pop();
        self.current_function_id = previous_fn;

        chunk.code = emitter.finish();
        Ok(chunk)
    }

    fn lookup_type(&self, name: &str) -> Option<String> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name).cloned())
    }

    fn bind_local(&mut self, name: &str, ty: String) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), ty);
        }
    }

    /// Infer an expression's static type in the compiler's textual
    /// notation, used only to resolve member offsets and call dispatch —
    /// never enforced at runtime (types are "recorded but not enforced",
    /// §1 Non-goals).
    fn infer_type(&self, expr: &Expr) -> Option<String> {
        match expr {
            Expr::Int(_) => Some("int".to_string()),
            Expr::Float(_) => Some("float".to_string()),
            Expr::Str(_) => Some("string".to_string()),
            Expr::Bool(_) => Some("bool".to_string()),
            Expr::This => self.current_class.clone(),
            Expr::Ident(name) => {
                if self.module_aliases.contains_key(name) {
                    Some(format!("module:{name}"))
                } else {
                    self.lookup_type(name)
                }
            }
            Expr::New { class, .. } => Some(class.clone()),
            Expr::Lambda { .. } => Some("lambda".to_string()),
            Expr::Member { target, field } => {
                let target_ty = self.infer_type(target)?;
                let class = self.classes.get(&target_ty)?;
                class.type_of(field).map(str::to_string)
            }
            Expr::Index { target, .. } => {
                let target_ty = self.infer_type(target)?;
                target_ty
                    .strip_prefix('[')
                    .and_then(|rest| rest.strip_suffix(']'))
                    .map(str::to_string)
            }
            Expr::Call { callee, .. } => match callee.as_ref() {
                Expr::Ident(name) => self.function_ids.get(name).map(|_| "unknown".to_string()),
                _ => None,
            },
            _ => None,
        }
    }

    fn compile_stmt(&mut self, stmt: &Stmt, chunk: &mut Chunk, emitter: &mut Emitter) -> Result<(), CompileError> {
        match stmt {
            Stmt::Let { name, ty, init } => {
                self.compile_expr(init, chunk, emitter)?;
                self.bind_local(name, type_to_string(ty));
                let idx = chunk.add_name(name);
                emitter.op_operand(Opcode::SetName, idx as i32);
            }
            Stmt::Expr(expr) => {
                self.compile_expr(expr, chunk, emitter)?;
                emitter.op(Opcode::Pop);
            }
            Stmt::If { cond, then, else_ } => {
                self.compile_expr(cond, chunk, emitter)?;
                let else_label = emitter.new_label();
                let end_label = emitter.new_label();
                emitter.op_label(Opcode::JumpIfFalse, else_label);
                self.scopes.push(HashMap::new());
                for s in then {
                    self.compile_stmt(s, chunk, emitter)?;
                }
                self.scopes.pop();
                emitter.op_label(Opcode::Jump, end_label);
                emitter.mark_label(else_label);
                self.scopes.push(HashMap::new());
                for s in else_ {
                    self.compile_stmt(s, chunk, emitter)?;
                }
                self.scopes.pop();
                emitter.mark_label(end_label);
            }
            Stmt::While { cond, body } => {
                let start_label = emitter.new_label();
                let end_label = emitter.new_label();
                emitter.mark_label(start_label);
                self.compile_expr(cond, chunk, emitter)?;
                emitter.op_label(Opcode::JumpIfFalse, end_label);
                self.loops.push(LoopLabels {
                    break_label: end_label,
                    continue_label: start_label,
                });
                self.scopes.push(HashMap::new());
                for s in body {
                    self.compile_stmt(s, chunk, emitter)?;
                }
                self.scopes.pop();
                self.loops.pop();
                emitter.op_label(Opcode::Jump, start_label);
                emitter.mark_label(end_label);
            }
            Stmt::For { init, cond, step, body } => {
                self.scopes.push(HashMap::new());
                if let Some(init) = init {
                    self.compile_stmt(init, chunk, emitter)?;
                }
                let start_label = emitter.new_label();
                let continue_label = emitter.new_label();
                let end_label = emitter.new_label();
                emitter.mark_label(start_label);
                if let Some(cond) = cond {
                    self.compile_expr(cond, chunk, emitter)?;
                    emitter.op_label(Opcode::JumpIfFalse, end_label);
                }
                self.loops.push(LoopLabels {
                    break_label: end_label,
                    continue_label,
                });
                self.scopes.push(HashMap::new());
                for s in body {
                    self.compile_stmt(s, chunk, emitter)?;
                }
                self.scopes.pop();
                self.loops.pop();
                emitter.mark_label(continue_label);
                if let Some(step) = step {
                    self.compile_expr(step, chunk, emitter)?;
                    emitter.op(Opcode::Pop);
                }
                emitter.op_label(Opcode::Jump, start_label);
                emitter.mark_label(end_label);
                self.scopes.pop();
            }
            Stmt::Break => {
                let label = self.loops.last().ok_or(CompileError::BreakOutsideLoop)?.break_label;
                emitter.op_label(Opcode::Jump, label);
            }
            Stmt::Continue => {
                let label = self
                    .loops
                    .last()
                    .ok_or(CompileError::ContinueOutsideLoop)?
                    .continue_label;
                emitter.op_label(Opcode::Jump, label);
            }
            Stmt::Return(value) => {
                match value {
                    Some(expr) => {
                        self.compile_expr(expr, chunk, emitter)?;
                        emitter.op(Opcode::Return);
                    }
                    None => emitter.op(Opcode::Leave),
                }
            }
            Stmt::Block(stmts) => {
                self.scopes.push(HashMap::new());
                for s in stmts {
                    self.compile_stmt(s, chunk, emitter)?;
                }
                self.scopes.pop();
            }
        }
        Ok(())
    }

    fn compile_expr(&mut self, expr: &Expr, chunk: &mut Chunk, emitter: &mut Emitter) -> Result<(), CompileError> {
        match expr {
            Expr::Int(i) => {
                let idx = chunk.add_constant(Cell::Int(*i));
                emitter.op_operand(Opcode::LoadConst, idx as i32);
            }
            Expr::Float(f) => {
                let idx = chunk.add_constant(Cell::Float(*f));
                emitter.op_operand(Opcode::LoadConst, idx as i32);
            }
            Expr::Str(s) => {
                let idx = chunk.add_constant(Cell::Str(s.clone()));
                emitter.op_operand(Opcode::LoadConst, idx as i32);
            }
            Expr::Bool(b) => {
                let idx = chunk.add_constant(Cell::Bool(*b));
                emitter.op_operand(Opcode::LoadConst, idx as i32);
            }
            Expr::Null => {
                let idx = chunk.add_constant(Cell::Null);
                emitter.op_operand(Opcode::LoadConst, idx as i32);
            }
            Expr::This => {
                if self.current_class.is_none() {
                    return Err(CompileError::ThisOutsideMethod);
                }
                let idx = chunk.add_name("this");
                emitter.op_operand(Opcode::LoadName, idx as i32);
            }
            Expr::Ident(name) => {
                let idx = chunk.add_name(name);
                emitter.op_operand(Opcode::LoadName, idx as i32);
            }
            Expr::ArrayLit(elements) => {
                emitter.op_operand(Opcode::NewArray, elements.len() as i32);
                for (i, element) in elements.iter().enumerate() {
                    // `SET_ELEMENT` pops (index, object, value) top-first, so
                    // the stack must hold value, object, index bottom-to-top
                    // — same shape `compile_assign`'s `LValue::Index` arm
                    // produces. Unlike that arm, the array here has no
                    // expression to re-evaluate as the object; it's
                    // duplicated off the stack and swapped into place
                    // instead of being re-pushed by name.
                    emitter.op(Opcode::Dup);
                    self.compile_expr(element, chunk, emitter)?;
                    emitter.op(Opcode::Swap);
                    emitter.op_operand(Opcode::LoadImmediate, i as i32);
                    emitter.op(Opcode::SetElement);
                }
            }
            Expr::New { class, args } => {
                let descriptor = self.classes.get(class).ok_or_else(|| CompileError::UnknownClass(class.clone()))?;
                let field_count = descriptor.field_count();
                emitter.op_operand(Opcode::NewObject, field_count as i32);
                let symbol = method_symbol(class, "constructor");
                if self.function_ids.contains_key(&symbol) {
                    emitter.op(Opcode::Dup);
                    for arg in args {
                        self.compile_expr(arg, chunk, emitter)?;
                    }
                    let id = self.function_ids[&symbol];
                    emitter.op_operand(Opcode::Call, id as i32);
                    emitter.op(Opcode::Pop);
                }
            }
            Expr::Lambda { params, body, .. } => {
                self.compile_lambda(params, body, chunk, emitter)?;
            }
            Expr::Call { callee, args } => {
                self.compile_call(callee, args, chunk, emitter)?;
            }
            Expr::Member { target, field } => {
                self.compile_expr(target, chunk, emitter)?;
                let offset = self.member_offset(target, field)?;
                emitter.op_operand(Opcode::MemberGet, offset as i32);
                if is_primitive_type(self.infer_type(expr)) {
                    emitter.op(Opcode::Copy);
                }
            }
            Expr::Index { target, index } => {
                self.compile_expr(target, chunk, emitter)?;
                self.compile_expr(index, chunk, emitter)?;
                emitter.op(Opcode::GetElement);
                if is_primitive_type(self.infer_type(expr)) {
                    emitter.op(Opcode::Copy);
                }
            }
            Expr::Unary { op, expr } => {
                self.compile_expr(expr, chunk, emitter)?;
                emitter.op(match op {
                    UnOp::Neg => {
                        let zero = chunk.add_constant(Cell::Int(0));
                        emitter.op_operand(Opcode::LoadConst, zero as i32);
                        emitter.op(Opcode::Swap);
                        Opcode::Sub
                    }
                    UnOp::Not => Opcode::Not,
                    UnOp::BNot => Opcode::BNot,
                });
            }
            Expr::Binary { op, lhs, rhs } => {
                self.compile_expr(lhs, chunk, emitter)?;
                self.compile_expr(rhs, chunk, emitter)?;
                emitter.op(to_opcode(*op));
            }
            Expr::Assign { target, op, value } => {
                self.compile_assign(target, *op, value, chunk, emitter)?;
            }
            Expr::PreIncDec { op, target } => {
                self.compile_inc_dec(target, *op, chunk, emitter, true)?;
            }
            Expr::PostIncDec { op, target } => {
                self.compile_inc_dec(target, *op, chunk, emitter, false)?;
            }
        }
        Ok(())
    }

    fn compile_lambda(
        &mut self,
        params: &[ast::Param],
        body: &[Stmt],
        chunk: &mut Chunk,
        emitter: &mut Emitter,
    ) -> Result<(), CompileError> {
        let name = format!("lambda_{}", self.lambda_counter);
        self.lambda_counter += 1;
        let id = self.register_function(&name, params.len() as u32, true, placeholder_body());
        let lambda_chunk = self.compile_body(id, None, params, body, &[])?;
        self.replace_body(id, lambda_chunk);
        emitter.op_operand(Opcode::LoadFuncAddr, id as i32);
        let _ = chunk;
        Ok(())
    }

    fn compile_call(
        &mut self,
        callee: &Expr,
        args: &[Expr],
        chunk: &mut Chunk,
        emitter: &mut Emitter,
    ) -> Result<(), CompileError> {
        // Case 0: `append(value, target)` where `target` is an assignable
        // location. `append`'s native implementation mutates heap-boxed
        // arrays and strings in place through their shared reference, but
        // a bare `string` local is an owned `Cell::Str` with nothing to
        // share — so the compiler desugars to load-call-store-back,
        // pushing the container's current value instead of just reading
        // it, then writing the (possibly new) return value back into the
        // target (`original_source/running/native_proc.hpp`'s `append`
        // native, adapted for `Cell`'s value semantics on bare strings).
        if let Expr::Ident(name) = callee {
            if name == "append" && args.len() == 2 {
                if let Some(target_lvalue) = expr_as_lvalue(&args[1]) {
                    self.compile_expr(&args[0], chunk, emitter)?;
                    self.compile_lvalue_load(&target_lvalue, chunk, emitter)?;
                    let id = self.function_ids["append"];
                    emitter.op_operand(Opcode::Call, id as i32);
                    self.store_lvalue_from_stack(&target_lvalue, chunk, emitter)?;
                    return Ok(());
                }
            }
        }

        // Case 2: `alias.method(args)` where `alias` is a known module
        // import.
        if let Expr::Member { target, field } = callee {
            if let Expr::Ident(alias) = target.as_ref() {
                if self.module_aliases.contains_key(alias) {
                    for arg in args {
                        self.compile_expr(arg, chunk, emitter)?;
                    }
                    let alias_idx = chunk.add_constant(Cell::Str(alias.clone()));
                    emitter.op_operand(Opcode::LoadConst, alias_idx as i32);
                    let method_idx = chunk.add_constant(Cell::Str(field.clone()));
                    emitter.op_operand(Opcode::LoadModuleMethod, method_idx as i32);
                    emitter.op(Opcode::SpecialCall);
                    return Ok(());
                }
            }

            // Case 2b: `target.field(args)` where `field` names a
            // `lambda`-typed data member rather than a declared method —
            // the member holds a callable value, so load it and dispatch
            // indirectly (`original_source/front/compiler.hpp`'s
            // `visit_call_node`, the `!func_is_exist(...)` branch).
            let is_lambda_field = self
                .infer_type(target)
                .as_deref()
                .and_then(|ty| self.classes.get(ty))
                .and_then(|d| d.type_of(field))
                == Some("lambda")
                && !self.function_ids.contains_key(field);
            if is_lambda_field {
                for arg in args {
                    self.compile_expr(arg, chunk, emitter)?;
                }
                self.compile_expr(callee, chunk, emitter)?;
                emitter.op(Opcode::SpecialCall);
                return Ok(());
            }

            // Case 2c: a true method call — push the receiver (no
            // `MEMBER_GET`; the callee's parameter-binding prologue binds
            // it to `this`), then the arguments, then call the method's
            // function id directly by its (unqualified, per
            // `method_symbol`) name.
            self.compile_expr(target, chunk, emitter)?;
            for arg in args {
                self.compile_expr(arg, chunk, emitter)?;
            }
            let id = self
                .function_ids
                .get(field)
                .copied()
                .ok_or_else(|| CompileError::UnknownFunction(field.clone()))?;
            emitter.op_operand(Opcode::Call, id as i32);
            return Ok(());
        }

        // Case 1: a bare name bound to a `lambda`-typed value.
        if let Expr::Ident(name) = callee {
            let is_lambda_value = self
                .lookup_type(name)
                .is_some_and(|ty| ty == "lambda")
                && !self.function_ids.contains_key(name);
            if is_lambda_value {
                for arg in args {
                    self.compile_expr(arg, chunk, emitter)?;
                }
                self.compile_expr(callee, chunk, emitter)?;
                emitter.op(Opcode::SpecialCall);
                return Ok(());
            }
        }

        // Case 3: a direct call resolved to a function id at compile
        // time.
        let Expr::Ident(name) = callee else {
            for arg in args {
                self.compile_expr(arg, chunk, emitter)?;
            }
            self.compile_expr(callee, chunk, emitter)?;
            emitter.op(Opcode::SpecialCall);
            return Ok(());
        };
        let id = self
            .function_ids
            .get(name)
            .copied()
            .ok_or_else(|| CompileError::UnknownFunction(name.clone()))?;
        for arg in args {
            self.compile_expr(arg, chunk, emitter)?;
        }
        emitter.op_operand(Opcode::Call, id as i32);
        Ok(())
    }

    fn member_offset(&self, target: &Expr, field: &str) -> Result<usize, CompileError> {
        let class_name = self.infer_type(target).ok_or(CompileError::UnresolvedMemberTarget)?;
        let descriptor = self
            .classes
            .get(&class_name)
            .ok_or_else(|| CompileError::UnknownClass(class_name.clone()))?;
        descriptor.offset_of(field).ok_or_else(|| CompileError::UnknownField {
            class: class_name.clone(),
            field: field.to_string(),
        })
    }

    fn compile_assign(
        &mut self,
        target: &LValue,
        op: Option<BinOp>,
        value: &Expr,
        chunk: &mut Chunk,
        emitter: &mut Emitter,
    ) -> Result<(), CompileError> {
        match target {
            LValue::Name(name) => {
                if let Some(op) = op {
                    let idx = chunk.add_name(name);
                    emitter.op_operand(Opcode::LoadName, idx as i32);
                    self.compile_expr(value, chunk, emitter)?;
                    emitter.op(to_opcode(op));
                } else {
                    self.compile_expr(value, chunk, emitter)?;
                }
                emitter.op(Opcode::Dup);
                let idx = chunk.add_name(name);
                emitter.op_operand(Opcode::SetName, idx as i32);
            }
            LValue::Member { target: obj, field } => {
                // `obj` is compiled twice (once to read the current value
                // for a compound op, once to address the store) rather
                // than shuffled through `DUP`/`ROT` — a stack-neutral
                // result is easier to get right this way, at the cost of
                // re-evaluating a target expression that is assumed
                // side-effect-free (always true for the `LValue` shapes
                // the parser produces: a name or a chain of member/index
                // accesses).
                let offset = self.member_offset(obj, field)?;
                if let Some(op) = op {
                    self.compile_expr(obj, chunk, emitter)?;
                    emitter.op_operand(Opcode::MemberGet, offset as i32);
                    self.compile_expr(value, chunk, emitter)?;
                    emitter.op(to_opcode(op));
                } else {
                    self.compile_expr(value, chunk, emitter)?;
                }
                emitter.op(Opcode::Dup);
                self.compile_expr(obj, chunk, emitter)?;
                emitter.op_operand(Opcode::MemberSet, offset as i32);
            }
            LValue::Index { target: obj, index } => {
                if let Some(op) = op {
                    self.compile_expr(obj, chunk, emitter)?;
                    self.compile_expr(index, chunk, emitter)?;
                    emitter.op(Opcode::GetElement);
                    self.compile_expr(value, chunk, emitter)?;
                    emitter.op(to_opcode(op));
                } else {
                    self.compile_expr(value, chunk, emitter)?;
                }
                emitter.op(Opcode::Dup);
                self.compile_expr(obj, chunk, emitter)?;
                self.compile_expr(index, chunk, emitter)?;
                emitter.op(Opcode::SetElement);
            }
        }
        Ok(())
    }

    fn compile_inc_dec(
        &mut self,
        target: &LValue,
        op: IncDecOp,
        chunk: &mut Chunk,
        emitter: &mut Emitter,
        is_pre: bool,
    ) -> Result<(), CompileError> {
        let bin_op = match op {
            IncDecOp::Inc => BinOp::Add,
            IncDecOp::Dec => BinOp::Sub,
        };
        let one = Expr::Int(1);
        if is_pre {
            // Pre-form: mutate, then load the new value — reusing the
            // compound-assignment lowering gives us the new value on the
            // stack already.
            self.compile_assign(target, Some(bin_op), &one, chunk, emitter)?;
        } else {
            // Post-form: load the current value first, perform the
            // mutation, then discard the mutation's result and leave the
            // pre-mutation value on the stack. Symmetric with the pre
            // form per the REDESIGN FLAG (§9, design note 7) rather than
            // the original's member-target bug.
            self.compile_lvalue_load(target, chunk, emitter)?;
            emitter.op(Opcode::Dup);
            self.compile_assign(target, Some(bin_op), &one, chunk, emitter)?;
            emitter.op(Opcode::Pop);
        }
        Ok(())
    }

    /// Store the value already sitting on top of the stack into `target`,
    /// leaving a copy of it as the expression's result — the same
    /// stack-neutral-plus-one shape [`Compiler::compile_assign`] produces.
    fn store_lvalue_from_stack(
        &mut self,
        target: &LValue,
        chunk: &mut Chunk,
        emitter: &mut Emitter,
    ) -> Result<(), CompileError> {
        match target {
            LValue::Name(name) => {
                emitter.op(Opcode::Dup);
                let idx = chunk.add_name(name);
                emitter.op_operand(Opcode::SetName, idx as i32);
            }
            LValue::Member { target: obj, field } => {
                let offset = self.member_offset(obj, field)?;
                emitter.op(Opcode::Dup);
                self.compile_expr(obj, chunk, emitter)?;
                emitter.op_operand(Opcode::MemberSet, offset as i32);
            }
            LValue::Index { target: obj, index } => {
                emitter.op(Opcode::Dup);
                self.compile_expr(obj, chunk, emitter)?;
                self.compile_expr(index, chunk, emitter)?;
                emitter.op(Opcode::SetElement);
            }
        }
        Ok(())
    }

    fn compile_lvalue_load(&mut self, target: &LValue, chunk: &mut Chunk, emitter: &mut Emitter) -> Result<(), CompileError> {
        match target {
            LValue::Name(name) => {
                let idx = chunk.add_name(name);
                emitter.op_operand(Opcode::LoadName, idx as i32);
            }
            LValue::Member { target: obj, field } => {
                self.compile_expr(obj, chunk, emitter)?;
                let offset = self.member_offset(obj, field)?;
                emitter.op_operand(Opcode::MemberGet, offset as i32);
            }
            LValue::Index { target: obj, index } => {
                self.compile_expr(obj, chunk, emitter)?;
                self.compile_expr(index, chunk, emitter)?;
                emitter.op(Opcode::GetElement);
            }
        }
        Ok(())
    }
}

/// Whether `expr` is shaped like an assignable location (as opposed to
/// an arbitrary rvalue), for the `append` store-back desugaring.
fn expr_as_lvalue(expr: &Expr) -> Option<LValue> {
    match expr {
        Expr::Ident(name) => Some(LValue::Name(name.clone())),
        Expr::Member { target, field } => Some(LValue::Member {
            target: target.clone(),
            field: field.clone(),
        }),
        Expr::Index { target, index } => Some(LValue::Index {
            target: target.clone(),
            index: index.clone(),
        }),
        _ => None,
    }
}

fn placeholder_body() -> FunctionBody {
    FunctionBody::Script(Chunk::new())
}

fn method_symbol(class: &str, method: &str) -> String {
    if method == "constructor" {
        format!("{class}$constructor")
    } else {
        // Only the constructor is qualified by class name; other methods
        // live in the same flat function namespace as top-level `def`s
        // (`original_source/front/compiler.hpp`'s `visit_class_node` /
        // `find_function_by_name`), so two classes declaring a method of
        // the same name collide — faithfully, not accidentally.
        method.to_string()
    }
}

fn to_core_access(access: Access) -> CoreAccess {
    match access {
        Access::Public => CoreAccess::Public,
        Access::Private => CoreAccess::Private,
    }
}

/// Whether a member/element read of this type needs an `OP_COPY` behind
/// it to detach the loaded scalar from the heap node it came from
/// (`original_source/front/compiler.hpp`'s `visit_value`, which wraps
/// every `A_MEMBER_ACCESS`/`A_ELEMENT_GET` in `OP_COPY` for `int`/
/// `float`/`bool` results) — without it, two locals could end up sharing
/// one mutable heap cell.
fn is_primitive_type(ty: Option<String>) -> bool {
    matches!(ty.as_deref(), Some("int" | "float" | "bool"))
}

fn to_opcode(op: BinOp) -> Opcode {
    match op {
        BinOp::Add => Opcode::Add,
        BinOp::Sub => Opcode::Sub,
        BinOp::Mul => Opcode::Mul,
        BinOp::Div => Opcode::Div,
        BinOp::Mod => Opcode::Mod,
        BinOp::Shl => Opcode::Shl,
        BinOp::Shr => Opcode::Shr,
        BinOp::BAnd => Opcode::BAnd,
        BinOp::BOr => Opcode::BOr,
        BinOp::And => Opcode::And,
        BinOp::Or => Opcode::Or,
        BinOp::Eq => Opcode::Eq,
        BinOp::Neq => Opcode::Neq,
        BinOp::Lt => Opcode::Lt,
        BinOp::Le => Opcode::Le,
        BinOp::Gt => Opcode::Gt,
        BinOp::Ge => Opcode::Ge,
    }
}
