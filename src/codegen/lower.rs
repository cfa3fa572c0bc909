//! Понижение AST в инструкции.
//!
//! Обход в глубину. Выражение вычисляется в целевой регистр `Rk`,
//! временные значения занимают `Rk+1`, `Rk+2`, ... (стековая дисциплина).
//! Операторы всегда начинают с `R1`.

use super::error::CodegenError;
use super::instruction::{BinaryOp, Instruction, Label, Op, Register, UnaryOp};
use super::CodegenConfig;
use crate::parser::{AstNode, NodeKind};

type LowerResult = Result<(), CodegenError>;

/// Метки ближайшего цикла.
#[derive(Debug, Clone, Copy)]
struct LoopLabels {
    continue_to: Label,
    break_to: Label,
}

/// Генератор для одного вызова `generate`. Счётчик меток живёт только в нём.
pub struct Generator<'c> {
    config: &'c CodegenConfig,
    code: Vec<Instruction>,
    next_label: usize,
    loops: Vec<LoopLabels>,
}

impl<'c> Generator<'c> {
    pub fn new(config: &'c CodegenConfig) -> Self {
        Self {
            config,
            code: Vec::new(),
            next_label: 0,
            loops: Vec::new(),
        }
    }

    /// Сгенерировать код для корня `Program`.
    pub fn generate(mut self, ast: &AstNode) -> Result<Vec<Instruction>, CodegenError> {
        if ast.kind != NodeKind::Program {
            return Err(CodegenError::unsupported(
                &ast.kind,
                "root node must be a Program",
            ));
        }

        for item in &ast.children {
            match item.kind {
                NodeKind::Function => self.lower_function(item)?,
                _ => self.lower_statement(item)?,
            }
        }

        Ok(self.code)
    }

    fn emit(&mut self, op: Op) {
        self.code.push(op.into());
    }

    fn new_label(&mut self) -> Label {
        let label = Label(self.next_label);
        self.next_label += 1;
        label
    }

    /// Регистр с проверкой бюджета.
    fn register(&self, index: usize) -> Result<Register, CodegenError> {
        if index == 0 || index > self.config.max_registers {
            return Err(CodegenError::RegisterExhausted {
                limit: self.config.max_registers,
            });
        }
        Ok(Register(index))
    }

    fn first_register(&self) -> Result<Register, CodegenError> {
        self.register(1)
    }

    fn next_register(&self, reg: Register) -> Result<Register, CodegenError> {
        self.register(reg.0 + 1)
    }

    // === Функции ===

    fn lower_function(&mut self, node: &AstNode) -> LowerResult {
        let name = expect_value(node)?;
        let [_, params, body] = expect_children::<3>(node)?;
        if params.kind != NodeKind::Params || body.kind != NodeKind::Block {
            return Err(CodegenError::unsupported(
                &node.kind,
                "expected Type, Params and Block children",
            ));
        }

        self.emit(Op::Func(name.to_string()));
        for param in &params.children {
            if param.kind != NodeKind::Param {
                return Err(CodegenError::unsupported(&param.kind, "expected Param"));
            }
            self.emit(Op::Arg(expect_value(param)?.to_string()));
        }

        let outer_loops = std::mem::take(&mut self.loops);
        let result = self.lower_statement(body);
        self.loops = outer_loops;
        result?;

        // Неявный возврат, если тело не закончилось `return`.
        if body.children.last().map(|s| &s.kind) != Some(&NodeKind::Return) {
            self.emit(Op::Ret(None));
        }
        self.emit(Op::End(name.to_string()));
        Ok(())
    }

    // === Операторы ===

    fn lower_statement(&mut self, node: &AstNode) -> LowerResult {
        stacker::maybe_grow(64 * 1024, 1024 * 1024, || match &node.kind {
            NodeKind::Declaration => self.lower_declaration(node),
            NodeKind::Block => {
                for statement in &node.children {
                    self.lower_statement(statement)?;
                }
                Ok(())
            }
            NodeKind::ExprStmt => {
                let [expr] = expect_children::<1>(node)?;
                let reg = self.first_register()?;
                self.lower_expr(expr, reg)
            }
            NodeKind::Empty => Ok(()),
            NodeKind::If => self.lower_if(node),
            NodeKind::While => self.lower_while(node),
            NodeKind::For => self.lower_for(node),
            NodeKind::Return => self.lower_return(node),
            NodeKind::Break => {
                let labels = self.innermost_loop(node)?;
                self.emit(Op::Jump(labels.break_to));
                Ok(())
            }
            NodeKind::Continue => {
                let labels = self.innermost_loop(node)?;
                self.emit(Op::Jump(labels.continue_to));
                Ok(())
            }
            NodeKind::Function => Err(CodegenError::unsupported(
                &node.kind,
                "functions may only be defined at the top level",
            )),
            other => Err(CodegenError::unsupported(
                other,
                "no lowering rule for this node in statement position",
            )),
        })
    }

    /// `int x = e, y;` → по паре LOAD/STORE на каждую переменную.
    fn lower_declaration(&mut self, node: &AstNode) -> LowerResult {
        if node.children.is_empty() {
            return Err(CodegenError::unsupported(
                &node.kind,
                "declaration has no declarators",
            ));
        }

        let reg = self.first_register()?;
        for declarator in &node.children {
            if declarator.kind != NodeKind::Declarator {
                return Err(CodegenError::unsupported(
                    &declarator.kind,
                    "expected Declarator inside Declaration",
                ));
            }
            let name = expect_value(declarator)?;
            match declarator.children.as_slice() {
                [] => self.emit(Op::LoadImm { value: 0, dst: reg }),
                [init] => self.lower_expr(init, reg)?,
                _ => {
                    return Err(CodegenError::unsupported(
                        &declarator.kind,
                        "at most one initializer expected",
                    ))
                }
            }
            self.emit(Op::Store {
                src: reg,
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn lower_if(&mut self, node: &AstNode) -> LowerResult {
        let reg = self.first_register()?;
        let (cond, then_branch, else_branch) = match node.children.as_slice() {
            [cond, then_branch] => (cond, then_branch, None),
            [cond, then_branch, else_branch] => (cond, then_branch, Some(else_branch)),
            _ => {
                return Err(CodegenError::unsupported(
                    &node.kind,
                    format!("expected 2 or 3 children, found {}", node.children.len()),
                ))
            }
        };

        let else_label = self.new_label();
        self.lower_expr(cond, reg)?;
        self.emit(Op::JumpIfZero(reg, else_label));
        self.lower_statement(then_branch)?;

        match else_branch {
            Some(else_branch) => {
                let end_label = self.new_label();
                self.emit(Op::Jump(end_label));
                self.emit(Op::Label(else_label));
                self.lower_statement(else_branch)?;
                self.emit(Op::Label(end_label));
            }
            None => self.emit(Op::Label(else_label)),
        }
        Ok(())
    }

    fn lower_while(&mut self, node: &AstNode) -> LowerResult {
        let [cond, body] = expect_children::<2>(node)?;
        let reg = self.first_register()?;
        let start = self.new_label();
        let end = self.new_label();

        self.emit(Op::Label(start));
        self.lower_expr(cond, reg)?;
        self.emit(Op::JumpIfZero(reg, end));
        self.lower_loop_body(
            body,
            LoopLabels {
                continue_to: start,
                break_to: end,
            },
        )?;
        self.emit(Op::Jump(start));
        self.emit(Op::Label(end));
        Ok(())
    }

    fn lower_for(&mut self, node: &AstNode) -> LowerResult {
        let [init, cond, step, body] = expect_children::<4>(node)?;
        let reg = self.first_register()?;
        let start = self.new_label();
        let next = self.new_label();
        let end = self.new_label();

        self.lower_statement(init)?;
        self.emit(Op::Label(start));
        if cond.kind != NodeKind::Empty {
            self.lower_expr(cond, reg)?;
            self.emit(Op::JumpIfZero(reg, end));
        }
        self.lower_loop_body(
            body,
            LoopLabels {
                continue_to: next,
                break_to: end,
            },
        )?;
        self.emit(Op::Label(next));
        if step.kind != NodeKind::Empty {
            self.lower_expr(step, reg)?;
        }
        self.emit(Op::Jump(start));
        self.emit(Op::Label(end));
        Ok(())
    }

    fn lower_loop_body(&mut self, body: &AstNode, labels: LoopLabels) -> LowerResult {
        self.loops.push(labels);
        let result = self.lower_statement(body);
        self.loops.pop();
        result
    }

    fn innermost_loop(&self, node: &AstNode) -> Result<LoopLabels, CodegenError> {
        self.loops.last().copied().ok_or_else(|| {
            CodegenError::unsupported(&node.kind, "jump statement outside of a loop")
        })
    }

    fn lower_return(&mut self, node: &AstNode) -> LowerResult {
        match node.children.as_slice() {
            [] => self.emit(Op::Ret(None)),
            [value] => {
                let reg = self.first_register()?;
                self.lower_expr(value, reg)?;
                self.emit(Op::Ret(Some(reg)));
            }
            _ => {
                return Err(CodegenError::unsupported(
                    &node.kind,
                    "at most one return value expected",
                ))
            }
        }
        Ok(())
    }

    // === Выражения ===

    /// Вычислить выражение в регистр `dst`.
    fn lower_expr(&mut self, node: &AstNode, dst: Register) -> LowerResult {
        stacker::maybe_grow(64 * 1024, 1024 * 1024, || match &node.kind {
            NodeKind::Number => {
                let text = expect_value(node)?;
                let value = text.parse::<i64>().map_err(|_| {
                    CodegenError::unsupported(&node.kind, format!("invalid integer literal '{}'", text))
                })?;
                self.emit(Op::LoadImm { value, dst });
                Ok(())
            }
            NodeKind::Bool => {
                let value = match expect_value(node)? {
                    "true" => 1,
                    "false" => 0,
                    other => {
                        return Err(CodegenError::unsupported(
                            &node.kind,
                            format!("invalid boolean literal '{}'", other),
                        ))
                    }
                };
                self.emit(Op::LoadImm { value, dst });
                Ok(())
            }
            NodeKind::Identifier => {
                let name = expect_value(node)?;
                self.emit(Op::LoadVar {
                    name: name.to_string(),
                    dst,
                });
                Ok(())
            }
            NodeKind::BinaryExpr => self.lower_binary(node, dst),
            NodeKind::UnaryExpr => self.lower_unary(node, dst),
            NodeKind::PostfixExpr => self.lower_postfix(node, dst),
            NodeKind::Assign => self.lower_assign(node, dst),
            NodeKind::Call => self.lower_call(node, dst),
            other => Err(CodegenError::unsupported(
                other,
                "no lowering rule for this node in expression position",
            )),
        })
    }

    fn lower_binary(&mut self, node: &AstNode, dst: Register) -> LowerResult {
        let op = expect_value(node)?;
        let [lhs, rhs] = expect_children::<2>(node)?;

        match op {
            "&&" => return self.lower_short_circuit(lhs, rhs, dst, false),
            "||" => return self.lower_short_circuit(lhs, rhs, dst, true),
            _ => {}
        }

        let binary = BinaryOp::from_operator(op).ok_or_else(|| {
            CodegenError::unsupported(&node.kind, format!("unknown binary operator '{}'", op))
        })?;

        let tmp = self.next_register(dst)?;
        self.lower_expr(lhs, dst)?;
        self.lower_expr(rhs, tmp)?;
        self.emit(Op::Binary {
            op: binary,
            dst,
            lhs: dst,
            rhs: tmp,
        });
        Ok(())
    }

    /// `&&` / `||` с коротким замыканием, результат 0 или 1.
    fn lower_short_circuit(
        &mut self,
        lhs: &AstNode,
        rhs: &AstNode,
        dst: Register,
        is_or: bool,
    ) -> LowerResult {
        let decided = self.new_label();
        let end = self.new_label();
        let jump = |reg, label| {
            if is_or {
                Op::JumpIfNotZero(reg, label)
            } else {
                Op::JumpIfZero(reg, label)
            }
        };

        self.lower_expr(lhs, dst)?;
        self.emit(jump(dst, decided));
        self.lower_expr(rhs, dst)?;
        self.emit(jump(dst, decided));
        self.emit(Op::LoadImm {
            value: if is_or { 0 } else { 1 },
            dst,
        });
        self.emit(Op::Jump(end));
        self.emit(Op::Label(decided));
        self.emit(Op::LoadImm {
            value: if is_or { 1 } else { 0 },
            dst,
        });
        self.emit(Op::Label(end));
        Ok(())
    }

    fn lower_unary(&mut self, node: &AstNode, dst: Register) -> LowerResult {
        let op = expect_value(node)?;
        let [operand] = expect_children::<1>(node)?;

        match op {
            "+" => self.lower_expr(operand, dst),
            "++" | "--" => {
                // Префиксная форма: результат - новое значение.
                let name = expect_identifier(operand)?;
                let tmp = self.next_register(dst)?;
                self.emit(Op::LoadVar {
                    name: name.to_string(),
                    dst,
                });
                self.emit(Op::LoadImm { value: 1, dst: tmp });
                self.emit(Op::Binary {
                    op: step_op(op),
                    dst,
                    lhs: dst,
                    rhs: tmp,
                });
                self.emit(Op::Store {
                    src: dst,
                    name: name.to_string(),
                });
                Ok(())
            }
            _ => {
                let unary = UnaryOp::from_operator(op).ok_or_else(|| {
                    CodegenError::unsupported(&node.kind, format!("unknown unary operator '{}'", op))
                })?;
                self.lower_expr(operand, dst)?;
                self.emit(Op::Unary {
                    op: unary,
                    dst,
                    src: dst,
                });
                Ok(())
            }
        }
    }

    /// `x++` / `x--`: результат - старое значение.
    fn lower_postfix(&mut self, node: &AstNode, dst: Register) -> LowerResult {
        let op = expect_value(node)?;
        if op != "++" && op != "--" {
            return Err(CodegenError::unsupported(
                &node.kind,
                format!("unknown postfix operator '{}'", op),
            ));
        }
        let [operand] = expect_children::<1>(node)?;
        let name = expect_identifier(operand)?;
        let tmp = self.next_register(dst)?;

        self.emit(Op::LoadVar {
            name: name.to_string(),
            dst,
        });
        self.emit(Op::LoadImm { value: 1, dst: tmp });
        self.emit(Op::Binary {
            op: step_op(op),
            dst: tmp,
            lhs: dst,
            rhs: tmp,
        });
        self.emit(Op::Store {
            src: tmp,
            name: name.to_string(),
        });
        Ok(())
    }

    /// `x = e` и составные `x op= e`; значение выражения остаётся в `dst`.
    fn lower_assign(&mut self, node: &AstNode, dst: Register) -> LowerResult {
        let op = expect_value(node)?;
        let [target, value] = expect_children::<2>(node)?;
        let name = expect_identifier(target)?;

        if op == "=" {
            self.lower_expr(value, dst)?;
        } else {
            let binary = BinaryOp::from_compound_assign(op).ok_or_else(|| {
                CodegenError::unsupported(&node.kind, format!("unknown assignment operator '{}'", op))
            })?;
            let tmp = self.next_register(dst)?;
            self.emit(Op::LoadVar {
                name: name.to_string(),
                dst,
            });
            self.lower_expr(value, tmp)?;
            self.emit(Op::Binary {
                op: binary,
                dst,
                lhs: dst,
                rhs: tmp,
            });
        }

        self.emit(Op::Store {
            src: dst,
            name: name.to_string(),
        });
        Ok(())
    }

    /// Аргументы вычисляются в `dst..dst+n`, затем передаются по порядку.
    fn lower_call(&mut self, node: &AstNode, dst: Register) -> LowerResult {
        let name = expect_value(node)?;

        let mut regs = Vec::with_capacity(node.children.len());
        let mut reg = dst;
        for (i, arg) in node.children.iter().enumerate() {
            if i > 0 {
                reg = self.next_register(reg)?;
            }
            self.lower_expr(arg, reg)?;
            regs.push(reg);
        }
        for reg in regs {
            self.emit(Op::Param(reg));
        }
        self.emit(Op::Call {
            name: name.to_string(),
            dst,
        });
        Ok(())
    }
}

fn step_op(op: &str) -> BinaryOp {
    if op == "++" {
        BinaryOp::Add
    } else {
        BinaryOp::Sub
    }
}

fn expect_value(node: &AstNode) -> Result<&str, CodegenError> {
    node.value()
        .ok_or_else(|| CodegenError::unsupported(&node.kind, "missing value"))
}

fn expect_identifier(node: &AstNode) -> Result<&str, CodegenError> {
    if node.kind != NodeKind::Identifier {
        return Err(CodegenError::unsupported(
            &node.kind,
            "expected an Identifier operand",
        ));
    }
    expect_value(node)
}

fn expect_children<const N: usize>(node: &AstNode) -> Result<&[AstNode; N], CodegenError> {
    node.children.as_slice().try_into().map_err(|_| {
        CodegenError::unsupported(
            &node.kind,
            format!("expected {} children, found {}", N, node.children.len()),
        )
    })
}
