//! Property-based tests for the command execution gate

use mosaicmux::config::ConfirmationPolicy;
use mosaicmux::events::{CommandStatusUpdate, LifecycleEvent};
use mosaicmux::gate::GateAction;
use mosaicmux::models::{
    CommandBlock, CommandId, CommandStatus, ExecutionResult, Session, SessionId,
};
use mosaicmux::multiplexer::GateOutcome;
use mosaicmux::{Config, SessionMultiplexer};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Request(GateAction),
    Confirm,
    CancelWarning,
    Reset,
    Finish(Option<i32>),
    Cancel,
    External(CommandStatus),
}

fn action_strategy() -> impl Strategy<Value = GateAction> {
    prop_oneof![
        Just(GateAction::Copy),
        Just(GateAction::SendToTerminal),
        Just(GateAction::Execute),
    ]
}

fn status_strategy() -> impl Strategy<Value = CommandStatus> {
    prop_oneof![
        Just(CommandStatus::Pending),
        Just(CommandStatus::Copied),
        Just(CommandStatus::SentToTerminal),
        Just(CommandStatus::Executed),
        Just(CommandStatus::Failed),
        Just(CommandStatus::Cancelled),
    ]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => action_strategy().prop_map(Op::Request),
        3 => Just(Op::Confirm),
        1 => Just(Op::CancelWarning),
        1 => Just(Op::Reset),
        2 => prop::option::of(-2i32..3).prop_map(Op::Finish),
        1 => Just(Op::Cancel),
        1 => status_strategy().prop_map(Op::External),
    ]
}

fn policy_strategy() -> impl Strategy<Value = ConfirmationPolicy> {
    prop_oneof![
        Just(ConfirmationPolicy::SingleShot),
        Just(ConfirmationPolicy::Sticky),
    ]
}

fn setup(policy: ConfirmationPolicy, block: CommandBlock) -> (SessionMultiplexer, CommandId) {
    let mut config = Config::default();
    config.gate.confirmation = policy;
    let mut mux = SessionMultiplexer::new(&config).unwrap();
    mux.apply_event(LifecycleEvent::SessionCreated(Session::new(
        SessionId::new(),
        "/bin/sh",
        "/",
    )));
    let id = mux.register_block(block);
    (mux, id)
}

fn status_of(mux: &SessionMultiplexer, id: CommandId) -> CommandStatus {
    mux.block(id).unwrap().status()
}

/// Apply one operation the way the coordinator would
fn apply(mux: &mut SessionMultiplexer, id: CommandId, op: &Op) -> Option<GateOutcome> {
    match op {
        Op::Request(action) => {
            let outcome = mux.request(id, *action).unwrap();
            if let GateOutcome::Proceed(_) = &outcome {
                match action {
                    GateAction::Copy => {
                        mux.mark_copied(id);
                    }
                    GateAction::SendToTerminal => {
                        mux.mark_sent(id);
                    }
                    GateAction::Execute => {}
                }
            }
            return Some(outcome);
        }
        Op::Confirm => mux.confirm(id).unwrap(),
        Op::CancelWarning => mux.cancel_warning(id).unwrap(),
        Op::Reset => mux.reset_confirmation(id).unwrap(),
        Op::Finish(exit_code) => {
            let result = match exit_code {
                Some(code) => ExecutionResult::executed(None).with_exit_code(*code),
                None => ExecutionResult::failed("service fault"),
            };
            mux.finish_execution(id, result);
        }
        Op::Cancel => {
            mux.cancel_execution(id).unwrap();
        }
        Op::External(status) => {
            let old = status_of(mux, id);
            mux.apply_command_status(CommandStatusUpdate {
                command_id: id,
                old,
                new: *status,
            });
        }
    }
    None
}

proptest! {
    #[test]
    fn test_dangerous_dispatch_needs_prior_confirmation(
        policy in policy_strategy(),
        ops in prop::collection::vec(op_strategy(), 0..50),
    ) {
        let block =
            CommandBlock::new("rm -rf ./out", "bash").with_danger("Recursively deletes files");
        let (mut mux, id) = setup(policy, block);
        let mut confirmed = false;

        for op in &ops {
            let before = status_of(&mux, id);
            let outcome = apply(&mut mux, id, op);

            match (op, outcome) {
                (Op::Confirm, _) => confirmed = true,
                (Op::CancelWarning, _) | (Op::Reset, _) => confirmed = false,
                (Op::Request(action), Some(GateOutcome::Proceed(_))) if action.is_gated() => {
                    prop_assert!(confirmed, "{:?} dispatched without confirmation", action);
                    if policy == ConfirmationPolicy::SingleShot {
                        confirmed = false;
                    }
                    if *action == GateAction::Execute {
                        prop_assert!(before.can_execute());
                        prop_assert_eq!(status_of(&mux, id), CommandStatus::Executing);
                    }
                }
                (Op::Request(action), Some(GateOutcome::WarningRequested)) => {
                    prop_assert!(action.is_gated());
                    prop_assert!(!confirmed);
                    prop_assert!(mux.gate(id).unwrap().danger().warning_visible);
                }
                _ => {}
            }
            prop_assert_eq!(mux.gate(id).unwrap().danger().confirmed, confirmed);
        }
    }

    #[test]
    fn test_executable_iff_idle_and_unfinished(
        dangerous in any::<bool>(),
        ops in prop::collection::vec(op_strategy(), 0..50),
    ) {
        let mut block = CommandBlock::new("make install", "bash");
        if dangerous {
            block = block.with_danger("Installs system-wide");
        }
        let (mut mux, id) = setup(ConfirmationPolicy::SingleShot, block);

        for op in &ops {
            let executable_before = mux.is_executable(id).unwrap();
            let outcome = apply(&mut mux, id, op);

            if let (Op::Request(GateAction::Execute), Some(outcome)) = (op, &outcome) {
                prop_assert_eq!(
                    matches!(outcome, GateOutcome::Blocked(_)),
                    !executable_before
                );
            }

            let status = status_of(&mux, id);
            prop_assert_eq!(
                mux.is_executable(id).unwrap(),
                !matches!(
                    status,
                    CommandStatus::Executing
                        | CommandStatus::Executed
                        | CommandStatus::Failed
                        | CommandStatus::Cancelled
                )
            );
        }
    }

    #[test]
    fn test_safe_blocks_never_warn(
        policy in policy_strategy(),
        ops in prop::collection::vec(op_strategy(), 0..50),
    ) {
        let (mut mux, id) = setup(policy, CommandBlock::new("ls -la", "bash"));

        for op in &ops {
            let outcome = apply(&mut mux, id, op);
            prop_assert!(!matches!(outcome, Some(GateOutcome::WarningRequested)));
            prop_assert!(!mux.gate(id).unwrap().danger().warning_visible);
        }
    }

    #[test]
    fn test_results_after_cancel_are_ignored(exit_code in -2i32..3) {
        let block = CommandBlock::new("sleep 10", "bash");
        let (mut mux, id) = setup(ConfirmationPolicy::SingleShot, block);

        mux.request(id, GateAction::Execute).unwrap();
        prop_assert!(mux.cancel_execution(id).unwrap());
        let late = ExecutionResult::executed(None).with_exit_code(exit_code);
        prop_assert!(!mux.finish_execution(id, late));
        prop_assert_eq!(status_of(&mux, id), CommandStatus::Cancelled);
    }
}
