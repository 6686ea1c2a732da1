//! Binding for the `Counter` contract.
//!
//! ```solidity
//! contract Counter {
//!     uint256 private count;
//!     function increment() public;
//!     function decrement() public;   // reverts "Count cannot be negative" at zero
//!     function reset() public;
//!     function getCount() public view returns (uint256);
//! }
//! ```
//!
//! State-changing calls are only encoded here; signing and submission go
//! through [`TxBuilder`] and the submission watcher like any other transfer.
//!
//! [`TxBuilder`]: crate::blockchain::ethereum::transaction::TxBuilder

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, U256};
use alloy::rpc::types::TransactionRequest;
use alloy::sol;
use alloy::sol_types::{SolCall, SolValue};

use crate::blockchain::ethereum::client::EthereumClient;
use crate::blockchain::types::{BlockchainResult, RpcError};

sol! {
    contract Counter {
        function increment() external;
        function decrement() external;
        function reset() external;
        function getCount() external view returns (uint256);
    }
}

/// Creation bytecode (solc 0.8.30).
const COUNTER_BYTECODE: &str = "6080604052348015600e575f5ffd5b505f5f81905550610287806100225f395ff3fe608060405234801561000f575f5ffd5b506004361061004a575f3560e01c80632baeceb71461004e578063a87d942c14610058578063d09de08a14610076578063d826f88f14610080575b5f5ffd5b61005661008a565b005b6100606100e5565b60405161006d9190610125565b60405180910390f35b61007e6100ed565b005b610088610105565b005b5f5f54116100cd576040517f08c379a00000000000000000000000000000000000000000000000000000000081526004016100c490610198565b60405180910390fd5b5f5f8154809291906100de906101e3565b9190505550565b5f5f54905090565b5f5f8154809291906100fe9061020a565b9190505550565b5f5f81905550565b5f819050919050565b61011f8161010d565b82525050565b5f6020820190506101385f830184610116565b92915050565b5f82825260208201905092915050565b7f436f756e742063616e6e6f74206265206e6567617469766500000000000000005f82015250565b5f61018260188361013e565b915061018d8261014e565b602082019050919050565b5f6020820190508181035f8301526101af81610176565b9050919050565b7f4e487b71000000000000000000000000000000000000000000000000000000005f52601160045260245ffd5b5f6101ed8261010d565b91505f82036101ff576101fe6101b6565b5b600182039050919050565b5f6102148261010d565b91507fffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff8203610246576102456101b6565b5b60018201905091905056fea2646970667358221220dfe3333256f839bb27a49d4f2458a352705638654a3dee3ee82ef4e1d952a91e64736f6c634300081e0033";

/// Creation bytecode for deployment transactions.
pub fn deployment_code() -> BlockchainResult<Bytes> {
    alloy::hex::decode(COUNTER_BYTECODE)
        .map(Bytes::from)
        .map_err(|e| RpcError::rejected(format!("Invalid Counter bytecode: {e}")).into())
}

/// State-changing Counter methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterAction {
    Increment,
    Decrement,
    Reset,
}

impl CounterAction {
    pub fn calldata(self) -> Bytes {
        let encoded = match self {
            CounterAction::Increment => Counter::incrementCall {}.abi_encode(),
            CounterAction::Decrement => Counter::decrementCall {}.abi_encode(),
            CounterAction::Reset => Counter::resetCall {}.abi_encode(),
        };
        Bytes::from(encoded)
    }

    pub fn name(self) -> &'static str {
        match self {
            CounterAction::Increment => "increment",
            CounterAction::Decrement => "decrement",
            CounterAction::Reset => "reset",
        }
    }
}

/// Read the current count through `eth_call`.
pub async fn get_count(client: &EthereumClient, contract: Address) -> BlockchainResult<U256> {
    let request = TransactionRequest::default()
        .with_to(contract)
        .with_input(Bytes::from(Counter::getCountCall {}.abi_encode()));

    let output = client.call(request).await?;
    decode_count(&output)
}

fn decode_count(output: &[u8]) -> BlockchainResult<U256> {
    if output.is_empty() {
        return Err(RpcError::rejected("getCount returned no data; is the contract deployed?").into());
    }
    U256::abi_decode(output)
        .map_err(|e| RpcError::rejected(format!("Malformed getCount output: {e}")).into())
}
