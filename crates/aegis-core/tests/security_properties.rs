//! Behavioural properties of the access-control state machine across
//! arbitrary input sequences and simulated restarts.

use aegis_core::radio::{MAX_FRAME_LEN, RadioMessage};
use aegis_core::security::{
    AuthStateMachine, BootMode, Credential, FAILS_KEY, MAX_ATTEMPTS, Notification, SecurityState,
    Transition,
};
use aegis_core::storage::{CounterStore, MemoryCounterStore};
use proptest::prelude::*;

const CREDENTIAL: &str = "admin";

#[derive(Debug, Clone)]
enum Input {
    Radio(String),
    Button,
}

fn boot(store: MemoryCounterStore, mode: BootMode) -> AuthStateMachine<MemoryCounterStore> {
    AuthStateMachine::boot(store, Credential::new(CREDENTIAL).unwrap(), mode)
}

fn boot_with(violations: u32) -> AuthStateMachine<MemoryCounterStore> {
    boot(MemoryCounterStore::with_value(FAILS_KEY, violations), BootMode::Normal)
}

/// Power cycle: keep only what the store holds.
fn restart(machine: AuthStateMachine<MemoryCounterStore>) -> AuthStateMachine<MemoryCounterStore> {
    boot(machine.into_store(), BootMode::Normal)
}

fn radio(machine: &mut AuthStateMachine<MemoryCounterStore>, payload: &str) -> Transition {
    let message = RadioMessage::from_frame(payload.as_bytes()).unwrap();
    machine.on_radio_message(&message).unwrap()
}

fn apply(machine: &mut AuthStateMachine<MemoryCounterStore>, input: &Input) -> Transition {
    match input {
        Input::Radio(payload) => radio(machine, payload),
        Input::Button => machine.on_local_unlock_request().unwrap(),
    }
}

fn persisted(machine: AuthStateMachine<MemoryCounterStore>) -> u32 {
    machine.into_store().get(FAILS_KEY).unwrap()
}

/// Tokens that never match the credential once trimmed
fn wrong_token() -> impl Strategy<Value = String> {
    "[ -~]{0,32}".prop_filter("must not match the credential", |s| {
        s.trim_ascii() != CREDENTIAL
    })
}

/// Raw frames of any content up to a full packet that never match
fn wrong_frame() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=MAX_FRAME_LEN).prop_filter(
        "must not match the credential",
        |f| f.trim_ascii() != CREDENTIAL.as_bytes(),
    )
}

fn any_input() -> impl Strategy<Value = Input> {
    prop_oneof![
        wrong_token().prop_map(Input::Radio),
        Just(Input::Radio(CREDENTIAL.to_string())),
        Just(Input::Radio(format!("  {CREDENTIAL}\r\n"))),
        Just(Input::Button),
    ]
}

proptest! {
    #[test]
    fn max_attempts_wrong_tokens_disable_for_good(
        wrong in prop::collection::vec(wrong_token(), MAX_ATTEMPTS as usize),
        after in prop::collection::vec(any_input(), 0..20),
    ) {
        let mut machine = boot_with(0);
        for token in &wrong {
            radio(&mut machine, token);
        }
        prop_assert_eq!(machine.snapshot(), SecurityState::Disabled { violation_count: MAX_ATTEMPTS });

        for input in &after {
            prop_assert_eq!(apply(&mut machine, input), Transition::Ignored);
            prop_assert_eq!(machine.snapshot(), SecurityState::Disabled { violation_count: MAX_ATTEMPTS });
        }
    }

    #[test]
    fn restart_rederives_state_from_counter(violations in 0u32..10) {
        let machine = restart(boot_with(violations));
        let expected = if violations < MAX_ATTEMPTS {
            SecurityState::Locked { violation_count: violations }
        } else {
            SecurityState::Disabled { violation_count: violations }
        };
        prop_assert_eq!(machine.snapshot(), expected);
    }

    #[test]
    fn restart_anywhere_preserves_state(inputs in prop::collection::vec(any_input(), 0..30)) {
        let mut machine = boot_with(0);
        for input in &inputs {
            apply(&mut machine, input);
            let before = machine.snapshot();
            machine = restart(machine);
            let after = machine.snapshot();

            // Unlocked is not persisted: it comes back locked with a clean counter
            let expected = match before {
                SecurityState::Unlocked => SecurityState::Locked { violation_count: 0 },
                other => other,
            };
            prop_assert_eq!(after, expected);
        }
    }

    #[test]
    fn violation_count_never_decreases_while_locked(inputs in prop::collection::vec(wrong_token(), 0..10)) {
        let mut machine = boot_with(0);
        let mut last = 0;
        for token in &inputs {
            radio(&mut machine, token);
            let count = machine.snapshot().violation_count();
            prop_assert!(count >= last);
            prop_assert!(count <= MAX_ATTEMPTS);
            last = count;
        }
    }

    #[test]
    fn any_in_bounds_wrong_frame_is_a_violation(
        frame in wrong_frame(),
        violations in 0u32..MAX_ATTEMPTS,
    ) {
        let mut machine = boot_with(violations);
        let message = RadioMessage::from_frame(&frame).unwrap();
        machine.on_radio_message(&message).unwrap();

        let expected = violations + 1;
        if expected < MAX_ATTEMPTS {
            prop_assert_eq!(machine.snapshot(), SecurityState::Locked { violation_count: expected });
        } else {
            prop_assert_eq!(machine.snapshot(), SecurityState::Disabled { violation_count: expected });
        }
        prop_assert_eq!(persisted(machine), expected);
    }

    #[test]
    fn credential_unlocks_from_any_locked_count(violations in 0u32..MAX_ATTEMPTS) {
        let mut machine = boot_with(violations);
        prop_assert_eq!(radio(&mut machine, CREDENTIAL), Transition::Accepted(Notification::AccessGranted));
        prop_assert_eq!(machine.snapshot(), SecurityState::Unlocked);
        prop_assert_eq!(persisted(machine), 0);
    }

    #[test]
    fn button_unlocks_from_any_locked_count(violations in 0u32..MAX_ATTEMPTS) {
        let mut machine = boot_with(violations);
        prop_assert_eq!(
            machine.on_local_unlock_request().unwrap(),
            Transition::Accepted(Notification::ManualUnlock)
        );
        prop_assert_eq!(machine.snapshot(), SecurityState::Unlocked);
        prop_assert_eq!(persisted(machine), 0);
    }

    #[test]
    fn every_accepted_transition_is_persisted(inputs in prop::collection::vec(any_input(), 0..30)) {
        let mut machine = boot_with(0);
        for input in &inputs {
            let before = machine.store().table().get(FAILS_KEY);
            match apply(&mut machine, input) {
                Transition::Accepted(_) => prop_assert_eq!(
                    machine.store().table().get(FAILS_KEY),
                    machine.snapshot().violation_count()
                ),
                Transition::Ignored => prop_assert_eq!(machine.store().table().get(FAILS_KEY), before),
            }
        }
    }
}

#[test]
fn credential_while_unlocked_locks_remotely() {
    let mut machine = boot_with(0);
    radio(&mut machine, CREDENTIAL);
    assert_eq!(
        radio(&mut machine, CREDENTIAL),
        Transition::Accepted(Notification::RemoteLocked)
    );
    assert_eq!(machine.snapshot(), SecurityState::Locked { violation_count: 0 });
}

#[test]
fn button_ignored_while_disabled() {
    let mut machine = boot_with(MAX_ATTEMPTS);
    assert_eq!(machine.on_local_unlock_request(), Ok(Transition::Ignored));
    assert_eq!(machine.snapshot(), SecurityState::Disabled { violation_count: 3 });
}

#[test]
fn factory_reset_recovers_from_lockdown() {
    let machine = boot(
        MemoryCounterStore::with_value(FAILS_KEY, 3),
        BootMode::FactoryReset,
    );
    assert_eq!(machine.snapshot(), SecurityState::Locked { violation_count: 0 });
    assert_eq!(persisted(machine), 0);
}

#[test]
fn scenario_two_misses_then_credential() {
    let mut machine = boot_with(0);

    radio(&mut machine, "wrong");
    assert_eq!(machine.snapshot(), SecurityState::Locked { violation_count: 1 });
    radio(&mut machine, "wrong");
    assert_eq!(machine.snapshot(), SecurityState::Locked { violation_count: 2 });
    radio(&mut machine, "admin");
    assert_eq!(machine.snapshot(), SecurityState::Unlocked);

    assert_eq!(persisted(machine), 0);
}

#[test]
fn scenario_lockdown_survives_restart() {
    let mut machine = boot_with(2);

    assert_eq!(
        radio(&mut machine, "wrong"),
        Transition::Accepted(Notification::LockdownTriggered)
    );
    assert_eq!(machine.snapshot(), SecurityState::Disabled { violation_count: 3 });

    assert_eq!(radio(&mut machine, "admin"), Transition::Ignored);
    assert_eq!(machine.snapshot(), SecurityState::Disabled { violation_count: 3 });

    let machine = restart(machine);
    assert_eq!(machine.snapshot(), SecurityState::Disabled { violation_count: 3 });
}
