use ethereum_types::{Address, H256};
use hex_literal::hex;
use lfvm::{opcode::*, util::*, *};

#[test]
fn delegatecall_forwards_static_flag_and_gas() {
    EvmTester::new()
        .set_static(true)
        .code(Bytecode::new().append_bc(CallInstruction::delegatecall(0).gas(1)))
        .status(ExecutionStatus::Stopped)
        .inspect_host(|host, _| {
            let r = host.recorded.lock();
            assert_eq!(r.calls.len(), 1);
            let call_msg = r.calls.last().unwrap();
            assert_eq!(call_msg.gas, 1);
            assert!(call_msg.is_static);
        })
        .check()
}

#[test]
fn call_blocked_past_depth_limit_makes_no_call() {
    let t = EvmTester::new().depth(1024).code(
        Bytecode::new()
            .append_bc(CallInstruction::delegatecall(0).gas(16))
            .ret_top(),
    );

    t.status(ExecutionStatus::Returned)
        .output_value(0)
        .inspect_host(|host, _| {
            assert_eq!(host.recorded.lock().calls.len(), 0);
        })
        .check();
}

#[test]
fn create_records_a_call_with_initcode_as_input() {
    let address = Address::zero();

    EvmTester::new()
        .apply_host_fn(move |host, _| {
            host.accounts.entry(address).or_default().balance = 1.into();
            host.call_result.output_data = (&hex!("0a0b0c") as &[u8]).into();
            host.call_result.create_address = Some(address);
            host.call_result.gas_left = 200000;
        })
        .gas(300000)
        .code(hex!("602060006001f0600155"))
        .status(ExecutionStatus::Stopped)
        .inspect_host(move |host, _| {
            let r = host.recorded.lock();
            assert_eq!(r.calls.len(), 1);
            assert_eq!(r.calls.last().unwrap().kind, CallKind::Create);
            assert_eq!(r.calls.last().unwrap().input_data.len(), 0x20);
        })
        .check()
}

#[test]
fn create2_forwards_salt() {
    let t = EvmTester::new()
        .apply_host_fn(|host, msg| {
            host.accounts.entry(msg.destination).or_default().balance = 1.into();
        })
        .code(hex!("605a604160006001f5600155"));

    t.gas(300000)
        .inspect_host(|host, _| {
            let r = host.recorded.lock();
            assert_eq!(r.calls.len(), 1);
            assert_eq!(
                r.calls.last().unwrap().kind,
                CallKind::Create2 { salt: H256(ethereum_types::U256::from(0x5a).into()) }
            );
        })
        .check();
}

#[test]
fn call_like_opcodes_are_all_blocked_past_depth_limit() {
    for op in [
        OpCode::CALL,
        OpCode::CALLCODE,
        OpCode::DELEGATECALL,
        OpCode::STATICCALL,
        OpCode::CREATE,
        OpCode::CREATE2,
    ] {
        EvmTester::new()
            .depth(1024)
            .code(
                Bytecode::new()
                    .pushv(0)
                    .opcode(OpCode::DUP1)
                    .opcode(OpCode::DUP1)
                    .opcode(OpCode::DUP1)
                    .opcode(OpCode::DUP1)
                    .opcode(OpCode::DUP1)
                    .opcode(OpCode::DUP1)
                    .opcode(op)
                    .ret_top(),
            )
            .status(ExecutionStatus::Returned)
            .output_value(0)
            .inspect_host(|host, _| {
                assert_eq!(host.recorded.lock().calls.len(), 0);
            })
            .check()
    }
}

#[test]
fn call_output_is_copied_into_memory_via_ret() {
    for op in [OpCode::CALL, OpCode::CALLCODE, OpCode::DELEGATECALL, OpCode::STATICCALL] {
        let call_output = hex!("0a0b");

        let t = EvmTester::new().apply_host_fn(move |host, _| {
            host.accounts.entry(Address::zero()).or_default().balance = 1.into();
            host.call_result.output_data = (&call_output as &[u8]).into();
        });

        let code_prefix = Bytecode::new()
            .pushv(1)
            .opcode(OpCode::DUP1)
            .opcode(OpCode::DUP1)
            .opcode(OpCode::DUP1)
            .opcode(OpCode::DUP1)
            .opcode(OpCode::DUP1)
            .opcode(OpCode::DUP1)
            .pushb(hex!("7fffffffffffffff"));
        let code_suffix = Bytecode::new().ret(0, 2);

        t.code(Bytecode::new().append_bc(code_prefix).opcode(op).append_bc(code_suffix))
            .status(ExecutionStatus::Returned)
            .output_data(call_output)
            .check();
    }
}

#[test]
fn returndatasize_reflects_last_call_output_length() {
    let call_res_output_len = 13u8;

    EvmTester::new()
        .apply_host_fn(move |host, _| {
            host.call_result.output_data = vec![0xAB; call_res_output_len as usize].into();
        })
        .code(
            Bytecode::new()
                .pushv(0)
                .opcode(OpCode::DUP1)
                .opcode(OpCode::DUP1)
                .opcode(OpCode::DUP1)
                .opcode(OpCode::DUP1)
                .opcode(OpCode::DUP1)
                .opcode(OpCode::DELEGATECALL)
                .opcode(OpCode::RETURNDATASIZE)
                .mstore8(0)
                .pushv(1)
                .pushv(0)
                .opcode(OpCode::RETURN),
        )
        .status(ExecutionStatus::Returned)
        .output_data([call_res_output_len])
        .check();
}

#[test]
fn returndatacopy_copies_the_last_call_output() {
    let call_output = hex!("0102030405060700000000000000000000000000000000000000000000000000");

    EvmTester::new()
        .apply_host_fn(move |host, _| {
            host.call_result.output_data = call_output.to_vec().into();
        })
        .code(hex!("600080808060aa60fff4506020600060003e60206000f3"))
        .status(ExecutionStatus::Returned)
        .output_data(call_output)
        .check()
}

#[test]
fn returndatacopy_out_of_range_is_a_memory_error() {
    for code in [
        hex!("60008080808080fa6002600060003e"),
        hex!("60008080808080fa6001600160003e"),
        hex!("60008080808080fa6000600260003e"),
    ] {
        EvmTester::new()
            .apply_host_fn(|host, _| {
                host.call_result.output_data = vec![0].into();
            })
            .code(code)
            .status_one_of([ExecutionStatus::SegmentationFault, ExecutionStatus::Error])
            .check()
    }
}
