//! Scripted delegates for exercising the debug controller.
//!
//! A [`ScriptDelegate`] plays back a small program described as functions of
//! line-numbered steps, reporting every frame entry and statement boundary
//! to the hook exactly the way a real interpreter front end would —
//! including the same-line re-entries a real engine produces around nested
//! call expressions ([`Step::touch`]).

#![allow(missing_docs)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::delegate::{ExecutionDelegate, FrameHook, FrameId, FrameInfo, Input, Output};
use crate::error::DelegateError;
use crate::value::Value;

type EffectFn = Box<dyn Fn(&mut Scope<'_>) -> Result<(), DelegateError> + Send + Sync>;
type ArgsFn =
    Box<dyn Fn(&IndexMap<SmolStr, Value>, &Input) -> Vec<(SmolStr, Value)> + Send + Sync>;

/// Mutable view of the running frame handed to statement effects.
pub struct Scope<'a> {
    /// Input document for the whole run.
    pub input: &'a Input,
    /// Local bindings of the current frame.
    pub locals: &'a mut IndexMap<SmolStr, Value>,
    ret: &'a mut Option<Value>,
}

impl Scope<'_> {
    /// Bind a local.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        self.locals.insert(name.into(), value.into());
    }

    /// Read a local.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.locals.get(name)
    }

    /// Read an integer local, defaulting to 0.
    #[must_use]
    pub fn int(&self, name: &str) -> i64 {
        match self.locals.get(name) {
            Some(Value::Int(value)) => *value,
            _ => 0,
        }
    }

    /// Read an integer from the input document.
    #[must_use]
    pub fn input_int(&self, key: &str, default: i64) -> i64 {
        self.input.get(key).and_then(serde_json::Value::as_i64).unwrap_or(default)
    }

    /// Set the frame's return value.
    pub fn ret(&mut self, value: Value) {
        *self.ret = Some(value);
    }
}

enum Bind {
    Discard,
    Local(SmolStr),
    Return,
}

enum StepAction {
    /// A bare line visit with no effect; models engine re-entries onto the
    /// outer line of a multi-line expression.
    Touch,
    Effect(EffectFn),
    Call {
        callee: SmolStr,
        args: ArgsFn,
        bind: Bind,
    },
}

/// One line-numbered step of a scripted function body.
pub struct Step {
    line: u32,
    action: StepAction,
}

impl Step {
    /// A statement that mutates the frame scope.
    pub fn run(line: u32, effect: impl Fn(&mut Scope<'_>) + Send + Sync + 'static) -> Self {
        Self::try_run(line, move |scope| {
            effect(scope);
            Ok(())
        })
    }

    /// A statement whose effect may fail.
    pub fn try_run(
        line: u32,
        effect: impl Fn(&mut Scope<'_>) -> Result<(), DelegateError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            line,
            action: StepAction::Effect(Box::new(effect)),
        }
    }

    /// A statement that always fails.
    #[must_use]
    pub fn fail(line: u32, message: &str) -> Self {
        let message = message.to_string();
        Self::try_run(line, move |_| Err(DelegateError::execution(message.clone())))
    }

    /// A bare visit of `line` with no statement effect.
    #[must_use]
    pub fn touch(line: u32) -> Self {
        Self {
            line,
            action: StepAction::Touch,
        }
    }

    /// Call another scripted function, discarding its result.
    pub fn call(
        line: u32,
        callee: &str,
        args: impl Fn(&IndexMap<SmolStr, Value>, &Input) -> Vec<(SmolStr, Value)>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            line,
            action: StepAction::Call {
                callee: callee.into(),
                args: Box::new(args),
                bind: Bind::Discard,
            },
        }
    }

    /// Call another scripted function and bind its result to a local.
    pub fn call_bind(
        line: u32,
        callee: &str,
        bind: &str,
        args: impl Fn(&IndexMap<SmolStr, Value>, &Input) -> Vec<(SmolStr, Value)>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            line,
            action: StepAction::Call {
                callee: callee.into(),
                args: Box::new(args),
                bind: Bind::Local(bind.into()),
            },
        }
    }

    /// Forward all locals to `callee` and return its result; the body of a
    /// forwarding wrapper.
    #[must_use]
    pub fn tail_call(line: u32, callee: &str) -> Self {
        Self {
            line,
            action: StepAction::Call {
                callee: callee.into(),
                args: Box::new(|locals, _| {
                    locals
                        .iter()
                        .map(|(name, value)| (name.clone(), value.clone()))
                        .collect()
                }),
                bind: Bind::Return,
            },
        }
    }
}

/// A scripted function: a named body of steps in one source file.
pub struct Function {
    name: SmolStr,
    file: PathBuf,
    forwards_to: Option<SmolStr>,
    body: Vec<Step>,
}

impl Function {
    /// Define a function.
    pub fn new(name: &str, file: impl Into<PathBuf>, body: Vec<Step>) -> Self {
        Self {
            name: name.into(),
            file: file.into(),
            forwards_to: None,
            body,
        }
    }

    /// Define a forwarding wrapper: a trampoline that calls through to
    /// `target` with its own arguments and returns the target's result.
    pub fn wrapper(name: &str, file: impl Into<PathBuf>, line: u32, target: &str) -> Self {
        Self {
            name: name.into(),
            file: file.into(),
            forwards_to: Some(target.into()),
            body: vec![Step::tail_call(line, target)],
        }
    }
}

/// A delegate that plays back scripted functions.
pub struct ScriptDelegate {
    functions: Vec<Function>,
    entry: SmolStr,
    next_frame: AtomicU64,
}

impl ScriptDelegate {
    /// Build a delegate with `entry` as the program entrypoint.
    #[must_use]
    pub fn new(entry: &str, functions: Vec<Function>) -> Self {
        Self {
            functions,
            entry: entry.into(),
            next_frame: AtomicU64::new(1),
        }
    }

    fn function(&self, name: &str) -> Result<&Function, DelegateError> {
        self.functions
            .iter()
            .find(|function| function.name == name)
            .ok_or_else(|| DelegateError::UndefinedFunction(name.into()))
    }

    fn run_frame(
        &self,
        function: &Function,
        arguments: IndexMap<SmolStr, Value>,
        input: &Input,
        hook: &mut dyn FrameHook,
    ) -> Result<Option<Value>, DelegateError> {
        let id = FrameId(self.next_frame.fetch_add(1, Ordering::Relaxed));
        hook.on_frame_entry(&FrameInfo {
            id,
            file: &function.file,
            function: &function.name,
            forwards_to: function.forwards_to.as_deref(),
            arguments: &arguments,
        });
        let mut locals = arguments;
        let mut ret = None;
        let result = self.run_body(function, id, &mut locals, &mut ret, input, hook);
        hook.on_frame_exit(id);
        result.map(|()| ret)
    }

    fn run_body(
        &self,
        function: &Function,
        id: FrameId,
        locals: &mut IndexMap<SmolStr, Value>,
        ret: &mut Option<Value>,
        input: &Input,
        hook: &mut dyn FrameHook,
    ) -> Result<(), DelegateError> {
        for step in &function.body {
            if hook.on_statement(id, step.line, locals).is_break() {
                return Err(DelegateError::Cancelled);
            }
            match &step.action {
                StepAction::Touch => {}
                StepAction::Effect(effect) => {
                    let mut scope = Scope {
                        input,
                        locals,
                        ret,
                    };
                    effect(&mut scope)?;
                }
                StepAction::Call { callee, args, bind } => {
                    let call_args: IndexMap<SmolStr, Value> =
                        args(locals, input).into_iter().collect();
                    let callee = self.function(callee)?;
                    let value = self.run_frame(callee, call_args, input, hook)?;
                    match bind {
                        Bind::Discard => {}
                        Bind::Local(name) => {
                            locals.insert(name.clone(), value.unwrap_or(Value::Null));
                        }
                        Bind::Return => *ret = value,
                    }
                }
            }
        }
        Ok(())
    }
}

impl ExecutionDelegate for ScriptDelegate {
    fn run(&self, input: &Input, hook: &mut dyn FrameHook) -> Result<Output, DelegateError> {
        let entry = self.function(&self.entry)?;
        let ret = self.run_frame(entry, IndexMap::new(), input, hook)?;
        Ok(ret.as_ref().map_or(serde_json::Value::Null, Value::capture))
    }

    fn entrypoint(&self) -> Option<PathBuf> {
        self.function(&self.entry).ok().map(|f| f.file.clone())
    }
}
