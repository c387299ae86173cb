use alloy::{
    network::EthereumWallet,
    primitives::{Address, B256},
    providers::{DynProvider, ProviderBuilder},
    signers::local::PrivateKeySigner,
    sol,
};

use crate::ports::{
    chain::{ChainError, ChainPort},
    TxReceipt,
};

sol! {
    #[sol(rpc)]
    interface IMembersBadge {
        function merkleRoot() external view returns (bytes32);
        function setMerkleRoot(bytes32 newRoot) external;
        function claim(bytes32[] calldata merkleProof) external;
    }
}

/// Ethereum RPC adapter for one badge contract deployment.
#[derive(Clone)]
pub struct EthereumRpc {
    provider: DynProvider,
    badge: Address,
}

impl EthereumRpc {
    pub async fn new(
        rpc_url: &str,
        private_key: &str,
        badge: Address,
    ) -> Result<Self, ChainError> {
        let signer: PrivateKeySigner = private_key
            .parse()
            .map_err(|e| ChainError::Rpc(format!("Invalid private key: {}", e)))?;
        let wallet = EthereumWallet::from(signer);
        let provider = DynProvider::new(
            ProviderBuilder::new().wallet(wallet).connect_http(
                rpc_url
                    .parse()
                    .map_err(|e| ChainError::Rpc(format!("Invalid RPC URL: {}", e)))?,
            ),
        );

        Ok(Self { provider, badge })
    }

    fn convert_receipt(receipt: &alloy::rpc::types::TransactionReceipt) -> TxReceipt {
        TxReceipt {
            tx_hash: receipt.transaction_hash,
            success: receipt.status(),
        }
    }
}

impl ChainPort for EthereumRpc {
    async fn merkle_root(&self) -> Result<B256, ChainError> {
        let badge = IMembersBadge::new(self.badge, &self.provider);
        let root = badge
            .merkleRoot()
            .call()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;
        Ok(root)
    }

    async fn set_merkle_root(&self, root: B256) -> Result<TxReceipt, ChainError> {
        let badge = IMembersBadge::new(self.badge, &self.provider);
        let receipt = badge
            .setMerkleRoot(root)
            .send()
            .await
            .map_err(|e| ChainError::TransactionFailed(e.to_string()))?
            .get_receipt()
            .await
            .map_err(|e| ChainError::TransactionFailed(e.to_string()))?;

        if !receipt.status() {
            return Err(ChainError::TransactionFailed("setMerkleRoot reverted".into()));
        }

        Ok(Self::convert_receipt(&receipt))
    }

    async fn claim(&self, proof: &[B256]) -> Result<TxReceipt, ChainError> {
        let badge = IMembersBadge::new(self.badge, &self.provider);
        let receipt = badge
            .claim(proof.to_vec())
            .send()
            .await
            .map_err(|e| ChainError::TransactionFailed(e.to_string()))?
            .get_receipt()
            .await
            .map_err(|e| ChainError::TransactionFailed(e.to_string()))?;

        if !receipt.status() {
            return Err(ChainError::TransactionFailed("claim reverted".into()));
        }

        Ok(Self::convert_receipt(&receipt))
    }
}
