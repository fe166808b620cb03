// tests/property/transaction_test.rs

//! Property-based tests for batched transactions
//! Tests that a batch of N commands always yields N replies in command order

use crate::test_helpers::FakeEmulator;
use bytes::Bytes;
use proptest::prelude::*;
use retrolink::core::protocol::Command;
use retrolink::core::protocol::reply::{parse_read_reply, parse_status};
use retrolink::core::{ReadRequest, WriteRequest};

fn command_strategy() -> impl Strategy<Value = Command> {
    prop_oneof![
        Just(Command::GetStatus),
        Just(Command::GetVersion),
        (0u64..0x0100_0000, 1usize..=16)
            .prop_map(|(address, length)| Command::ReadCoreMemory { address, length }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 32, // Each case starts its own fake emulator
        max_shrink_iters: 200,
        ..ProptestConfig::default()
    })]

    #[test]
    fn test_transact_returns_one_reply_per_command_in_order(
        commands in prop::collection::vec(command_strategy(), 1..=24)
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let emulator = FakeEmulator::start().await;
            let mut client = emulator.connected_client().await;

            let replies = client.transact(&commands).await.unwrap();
            assert_eq!(replies.len(), commands.len());

            for (command, reply) in commands.iter().zip(&replies) {
                match command {
                    Command::GetStatus => {
                        parse_status(reply).unwrap();
                    }
                    Command::GetVersion => assert_eq!(reply, "1.19.1"),
                    Command::ReadCoreMemory { address, length } => {
                        let parsed = parse_read_reply(reply).unwrap();
                        assert_eq!(parsed.address, *address);
                        assert_eq!(parsed.data.len(), *length);
                    }
                    other => panic!("unexpected command {other:?}"),
                }
            }
        });
    }

    #[test]
    fn test_written_bytes_read_back(
        address in 0u64..0x00ff_0000,
        data in prop::collection::vec(any::<u8>(), 1..=64)
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let emulator = FakeEmulator::start().await;
            let mut client = emulator.connected_client().await;

            client
                .write(&[WriteRequest::new(address, data.clone())])
                .await
                .unwrap();
            let read = client
                .read(&[ReadRequest::new(address, data.len())])
                .await
                .unwrap();
            assert_eq!(read, vec![Bytes::from(data)]);
        });
    }
}
