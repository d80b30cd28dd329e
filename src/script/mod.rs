//! Scripts and their evaluation.
//!
//! A script is a sequence of whitespace-separated tokens. Evaluation is strictly linear: each
//! token either pushes itself or applies an opcode, and the first failure stops the script.

use std::{convert::Infallible, fmt, str::FromStr};

use thiserror::Error;
use tracing::trace;

use crate::{
    interpreter::{self, Stack},
    opcode::Operation,
    value::{self, Value},
};

/// Which half of a [`crate::Script`] an error arose in.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ComponentType {
    /// The script provided by the spending input.
    Unlock,
    /// The script attached to the output being spent.
    Lock,
}

/// Errors from evaluating a script, as opposed to a single opcode.
#[allow(missing_docs)]
#[derive(Clone, PartialEq, Debug, Error)]
pub enum Error {
    #[error(
        "interpreter error{}: {}",
        .0.as_ref().map_or("".to_owned(), |token| format!(" at {}", token)),
        .1
    )]
    Interpreter(Option<Token>, interpreter::Error),

    #[error("stack is empty after evaluation")]
    EmptyStack,

    #[error("an opcode was left on the stack: {0}")]
    UnconsumedOpcode(String),

    #[error("unlock script contains an opcode")]
    SigPushOnly,

    #[error("expected exactly one stack element after evaluation, found {0}")]
    CleanStack(usize),
}

/// A single token of a script.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Token {
    /// Anything that isn’t shaped like an opcode. It’s pushed verbatim.
    PushValue(String),
    /// A registered opcode.
    Operation(Operation),
    /// Shaped like an opcode, but not one that’s registered. Evaluating it fails.
    Unknown(String),
}

impl Token {
    /// Classify a token. This never fails, because unknown opcodes are only an error when
    /// they’re evaluated.
    pub fn parse(token: &str) -> Self {
        if value::is_opcode(token) {
            Operation::from_name(token).map_or_else(
                || Token::Unknown(token.to_owned()),
                Token::Operation,
            )
        } else {
            Token::PushValue(token.to_owned())
        }
    }

    pub fn eval(
        &self,
        flags: interpreter::Flags,
        checker: &dyn interpreter::SignatureChecker,
        stack: &mut Stack<Value>,
    ) -> Result<(), interpreter::Error> {
        match self {
            Token::PushValue(v) => {
                stack.push(Value::from(v.as_str()));
                Ok(())
            }
            Token::Operation(op) => op.eval(flags, checker, stack),
            Token::Unknown(name) => Err(interpreter::Error::UnsupportedOpcode(name.clone())),
        }
    }

    /// Statically analyze a token. That is, this identifies the runtime errors that don’t
    /// depend on the stack.
    pub fn analyze(&self) -> Result<(), interpreter::Error> {
        match self {
            Token::Unknown(name) => Err(interpreter::Error::UnsupportedOpcode(name.clone())),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::PushValue(v) | Token::Unknown(v) => f.write_str(v),
            Token::Operation(op) => fmt::Display::fmt(op, f),
        }
    }
}

impl From<Operation> for Token {
    fn from(value: Operation) -> Self {
        Token::Operation(value)
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Token::parse(value)
    }
}

/// A script, as a sequence of tokens.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Code(pub Vec<Token>);

impl Code {
    /// Splits the human-readable form of a script on whitespace.
    pub fn from_asm(asm: &str) -> Self {
        asm.split_whitespace().map(Token::parse).collect()
    }

    /// Returns every error that would be hit without running the script, in script order.
    pub fn analyze(&self) -> Result<(), Vec<interpreter::Error>> {
        let errors: Vec<_> = self.0.iter().filter_map(|t| t.analyze().err()).collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Returns true if the script contains no opcodes, registered or not.
    pub fn is_push_only(&self) -> bool {
        self.0.iter().all(|t| matches!(t, Token::PushValue(_)))
    }

    /// Evaluate each token in turn, stopping at the first failure. The stack is left as it was
    /// when evaluation stopped.
    pub fn eval(
        &self,
        flags: interpreter::Flags,
        checker: &dyn interpreter::SignatureChecker,
        stack: &mut Stack<Value>,
    ) -> Result<(), Error> {
        self.0.iter().try_for_each(|token| {
            trace!(%token, depth = stack.len(), "evaluating token");
            token
                .eval(flags, checker, stack)
                .map_err(|e| Error::Interpreter(Some(token.clone()), e))
        })
    }
}

impl FromIterator<Token> for Code {
    fn from_iter<I: IntoIterator<Item = Token>>(iter: I) -> Self {
        Code(iter.into_iter().collect())
    }
}

impl FromStr for Code {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Code::from_asm(s))
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tokens = self.0.iter();
        if let Some(first) = tokens.next() {
            fmt::Display::fmt(first, f)?;
            tokens.try_for_each(|token| write!(f, " {}", token))?;
        }
        Ok(())
    }
}

/// Runs an unlock script on a fresh stack.
///
/// The resulting stack has to be non-empty, and mustn’t contain anything shaped like an opcode.
pub fn eval_unlock(
    code: &Code,
    flags: interpreter::Flags,
    checker: &dyn interpreter::SignatureChecker,
) -> Result<Stack<Value>, Error> {
    let mut stack = Stack::new();
    code.eval(flags, checker, &mut stack)?;
    if stack.is_empty() {
        Err(Error::EmptyStack)
    } else if let Some(op) = stack.iter().find(|v| v.is_opcode()) {
        Err(Error::UnconsumedOpcode(op.text().into_owned()))
    } else {
        Ok(stack)
    }
}

/// Runs a lock script on the stack an unlock script left behind.
///
/// Returns `Ok(false)` when the top element is `0`. With [`interpreter::Flags::CleanStack`], any
/// other result needs to be the only element left.
pub fn eval_lock(
    code: &Code,
    mut stack: Stack<Value>,
    flags: interpreter::Flags,
    checker: &dyn interpreter::SignatureChecker,
) -> Result<bool, Error> {
    code.eval(flags, checker, &mut stack)?;
    let top = stack.last().map_err(|_| Error::EmptyStack)?;
    if top.is_false() {
        Ok(false)
    } else if flags.contains(interpreter::Flags::CleanStack) && stack.len() != 1 {
        Err(Error::CleanStack(stack.len()))
    } else {
        Ok(true)
    }
}

/// Evaluate an unlock script followed by a lock script on the same stack.
pub fn eval_script(
    unlock: &Code,
    lock: &Code,
    flags: interpreter::Flags,
    checker: &dyn interpreter::SignatureChecker,
) -> Result<bool, (ComponentType, Error)> {
    if flags.contains(interpreter::Flags::SigPushOnly) && !unlock.is_push_only() {
        return Err((ComponentType::Unlock, Error::SigPushOnly));
    }
    let data_stack =
        eval_unlock(unlock, flags, checker).map_err(|e| (ComponentType::Unlock, e))?;
    eval_lock(lock, data_stack, flags, checker).map_err(|e| (ComponentType::Lock, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::{Flags, NullSignatureChecker};

    fn run(asm: &str) -> (Result<(), Error>, Vec<String>) {
        let mut stack = Stack::new();
        let result = Code::from_asm(asm).eval(Flags::empty(), &NullSignatureChecker(), &mut stack);
        (result, stack.snapshot())
    }

    /// Evaluates a single script as if it were a lock script with nothing unlocking it.
    fn verdict(asm: &str) -> Result<bool, Error> {
        eval_lock(
            &Code::from_asm(asm),
            Stack::new(),
            Flags::STANDARD,
            &NullSignatureChecker(),
        )
    }

    fn unlock(asm: &str) -> Result<Vec<String>, Error> {
        eval_unlock(&Code::from_asm(asm), Flags::empty(), &NullSignatureChecker())
            .map(|stack| stack.snapshot())
    }

    #[test]
    fn tokens_are_classified_by_shape() {
        assert_eq!(Token::parse("abc"), Token::PushValue("abc".to_owned()));
        assert_eq!(Token::parse("OP_"), Token::PushValue("OP_".to_owned()));
        assert_eq!(Token::parse("OP_ADD"), Token::Operation(Operation::OP_ADD));
        assert_eq!(Token::parse("OP_1"), Token::Operation(Operation::OP_TRUE));
        assert_eq!(Token::parse("OP_MUL"), Token::Unknown("OP_MUL".to_owned()));
    }

    #[test]
    fn asm_round_trips() {
        let asm = "2 3 OP_ADD 5 OP_EQUAL";
        let code: Code = asm.parse().expect("infallible");
        assert_eq!(code.0.len(), 5);
        assert_eq!(code.to_string(), asm);
        assert_eq!(Code::from_asm("  a\n\tb  ").to_string(), "a b");
        assert_eq!(Code::from_asm("").0, vec![]);
    }

    #[test]
    fn tokens_convert_from_names_and_operations() {
        let built: Code = [
            Token::from("2"),
            Token::from(Operation::OP_DUP),
            Token::from("OP_ADD"),
            Token::from("4"),
            Token::from(Operation::OP_EQUAL),
        ]
        .into_iter()
        .collect();
        assert_eq!(built, Code::from_asm("2 OP_DUP OP_ADD 4 OP_EQUAL"));
        assert_eq!(Token::from("OP_MUL"), Token::Unknown("OP_MUL".to_owned()));
        assert_eq!(run(&built.to_string()), (Ok(()), vec!["1".to_owned()]));
    }

    #[test]
    fn analyze_finds_unsupported_opcodes() {
        assert_eq!(Code::from_asm("1 OP_DUP OP_EQUAL").analyze(), Ok(()));
        assert_eq!(
            Code::from_asm("OP_CAT 1 OP_NOPE").analyze(),
            Err(vec![
                interpreter::Error::UnsupportedOpcode("OP_CAT".to_owned()),
                interpreter::Error::UnsupportedOpcode("OP_NOPE".to_owned()),
            ])
        );
    }

    #[test]
    fn push_only() {
        assert!(Code::from_asm("1 abcd OP_").is_push_only());
        assert!(!Code::from_asm("1 OP_TRUE").is_push_only());
        assert!(!Code::from_asm("1 OP_UNKNOWN").is_push_only());
    }

    #[test]
    fn dangling_operator() {
        let (result, stack) = run("suchValue OP_ADD");
        assert_eq!(
            result,
            Err(Error::Interpreter(
                Some(Token::Operation(Operation::OP_ADD)),
                interpreter::Error::StackUnderflow {
                    needed: 2,
                    available: 1
                }
            ))
        );
        assert_eq!(stack, vec!["suchValue"]);
        assert!(verdict("suchValue OP_ADD").is_err());
        assert!(unlock("suchValue OP_ADD").is_err());
    }

    #[test]
    fn unsupported_opcode_halts() {
        let (result, stack) = run("1 OP_NOPE 2");
        assert_eq!(
            result,
            Err(Error::Interpreter(
                Some(Token::Unknown("OP_NOPE".to_owned())),
                interpreter::Error::UnsupportedOpcode("OP_NOPE".to_owned())
            ))
        );
        assert_eq!(stack, vec!["1"]);
    }

    #[test]
    fn empty_stack() {
        let (result, stack) = run("veryPubKey OP_DROP");
        assert_eq!(result, Ok(()));
        assert!(stack.is_empty());
        assert_eq!(verdict("veryPubKey OP_DROP"), Err(Error::EmptyStack));
        assert_eq!(unlock("veryPubKey OP_DROP"), Err(Error::EmptyStack));
        assert_eq!(unlock(""), Err(Error::EmptyStack));
    }

    #[test]
    fn too_many_results() {
        let (_, stack) = run("1 2 OP_ADD OP_DUP");
        assert_eq!(stack, vec!["3", "3"]);
        assert_eq!(verdict("1 2 OP_ADD OP_DUP"), Err(Error::CleanStack(2)));
        // Without a clean stack, only the top element matters.
        assert_eq!(
            eval_lock(
                &Code::from_asm("1 2 OP_ADD OP_DUP"),
                Stack::new(),
                Flags::empty(),
                &NullSignatureChecker()
            ),
            Ok(true)
        );
    }

    #[test]
    fn unsatisfied_equal() {
        let (_, stack) = run("1 2 OP_EQUAL");
        assert_eq!(stack, vec!["0"]);
        assert_eq!(verdict("1 2 OP_EQUAL"), Ok(false));
        // An unlock script only has to run, so `0` is an acceptable result.
        assert_eq!(unlock("1 2 OP_EQUAL"), Ok(vec!["0".to_owned()]));
    }

    #[test]
    fn unsatisfied_verify() {
        let asm = "1 2 OP_EQUALVERIFY OP_DROP OP_TRUE";
        let (result, stack) = run(asm);
        assert_eq!(
            result,
            Err(Error::Interpreter(
                Some(Token::Operation(Operation::OP_EQUALVERIFY)),
                interpreter::Error::VerificationFailed
            ))
        );
        assert!(stack.is_empty());
        assert!(verdict(asm).is_err());
        assert!(unlock(asm).is_err());
    }

    #[test]
    fn satisfied_equal() {
        let (_, stack) = run("2 2 OP_EQUAL");
        assert_eq!(stack, vec!["1"]);
        assert_eq!(verdict("2 2 OP_EQUAL"), Ok(true));
    }

    #[test]
    fn any_non_zero_value_is_accepted() {
        assert_eq!(verdict("suchValue"), Ok(true));
        assert_eq!(verdict("00"), Ok(true));
        assert_eq!(verdict("0"), Ok(false));
    }

    #[test]
    fn multiple_unlock_values() {
        assert_eq!(
            unlock("1 2 3"),
            Ok(vec!["1".to_owned(), "2".to_owned(), "3".to_owned()])
        );
    }

    #[test]
    fn unlock_may_not_leave_opcodes() {
        let code = Code(vec![
            Token::PushValue("1".to_owned()),
            Token::PushValue("OP_ADD".to_owned()),
        ]);
        assert_eq!(
            eval_unlock(&code, Flags::empty(), &NullSignatureChecker()).map(|s| s.snapshot()),
            Err(Error::UnconsumedOpcode("OP_ADD".to_owned()))
        );
    }

    #[test]
    fn sig_push_only_is_checked_before_evaluation() {
        let unlock = Code::from_asm("1 OP_DUP");
        let lock = Code::from_asm("OP_EQUAL");
        assert_eq!(
            eval_script(&unlock, &lock, Flags::SigPushOnly, &NullSignatureChecker()),
            Err((ComponentType::Unlock, Error::SigPushOnly))
        );
        assert_eq!(
            eval_script(&unlock, &lock, Flags::STANDARD, &NullSignatureChecker()),
            Ok(true)
        );
    }

    #[test]
    fn errors_name_the_component() {
        let checker = NullSignatureChecker();
        assert!(matches!(
            eval_script(
                &Code::from_asm("OP_RETURN"),
                &Code::from_asm("1"),
                Flags::STANDARD,
                &checker
            ),
            Err((ComponentType::Unlock, Error::Interpreter(_, _)))
        ));
        assert!(matches!(
            eval_script(
                &Code::from_asm("1"),
                &Code::from_asm("OP_RETURN"),
                Flags::STANDARD,
                &checker
            ),
            Err((
                ComponentType::Lock,
                Error::Interpreter(_, interpreter::Error::IntentionalHalt)
            ))
        ));
    }

    #[test]
    fn error_messages_name_the_token() {
        let (result, _) = run("OP_VERIFY");
        assert_eq!(
            result.map_err(|e| e.to_string()),
            Err("interpreter error at OP_VERIFY: expected 1 stack elements, but only 0 available"
                .to_owned())
        );
    }
}
