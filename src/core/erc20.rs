//! ERC20 Verifier
//!
//! Probes a freshly deployed contract for `name()`, `symbol()` and `decimals()`.
//! All three reads must succeed and decode for the contract to count as a token;
//! anything else is a classification negative, not a failure of the watcher.

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{sol, SolCall};

use crate::models::errors::{AppError, AppResult};
use crate::models::types::Erc20Facts;
use crate::providers::chain::ContractCaller;

// ERC20 metadata interface
sol! {
    function name() external view returns (string);
    function symbol() external view returns (string);
    function decimals() external view returns (uint8);
}

/// Read the metadata of `token`. `Err` means NOT-ERC20.
pub async fn verify<C>(caller: &C, token: Address) -> AppResult<Erc20Facts>
where
    C: ContractCaller + ?Sized,
{
    let (name, symbol, decimals) = tokio::try_join!(
        read_text(caller, token, nameCall {}.abi_encode(), "name"),
        read_text(caller, token, symbolCall {}.abi_encode(), "symbol"),
        read_decimals(caller, token),
    )?;

    Ok(Erc20Facts {
        name,
        symbol,
        decimals,
    })
}

async fn read_text<C>(caller: &C, token: Address, calldata: Vec<u8>, what: &str) -> AppResult<String>
where
    C: ContractCaller + ?Sized,
{
    let output = caller.call(token, Bytes::from(calldata)).await?;
    decode_text(&output)
        .ok_or_else(|| AppError::decode_failed(format!("{}() of {} is not a string", what, token)))
}

async fn read_decimals<C>(caller: &C, token: Address) -> AppResult<u32>
where
    C: ContractCaller + ?Sized,
{
    let output = caller
        .call(token, Bytes::from(decimalsCall {}.abi_encode()))
        .await?;
    decode_decimals(&output)
        .ok_or_else(|| AppError::decode_failed(format!("decimals() of {} is not an integer", token)))
}

/// ABI `string`, or the legacy `bytes32` form (trailing zero bytes trimmed)
pub fn decode_text(output: &[u8]) -> Option<String> {
    // name() and symbol() share the same return shape
    if let Ok(decoded) = nameCall::abi_decode_returns(output, true) {
        return Some(decoded._0);
    }

    if output.len() == 32 {
        let end = output.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
        return String::from_utf8(output[..end].to_vec()).ok();
    }

    None
}

/// First return word as an integer. Any width up to 256 bits is accepted as long
/// as the value fits `u32`.
pub fn decode_decimals(output: &[u8]) -> Option<u32> {
    if output.len() < 32 {
        return None;
    }
    let word = U256::from_be_slice(&output[..32]);
    u32::try_from(word).ok()
}
