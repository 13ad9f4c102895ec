use rand_core::{CryptoRng, RngCore};

use std::time::Duration;

use crate::{
    decryptor::{BalanceDecryptor, DecryptorConfig},
    errors::Result,
    Balance, CipherText, ElgamalKeys, ElgamalPublicKey, ElgamalSecretKey,
};

pub mod balance_range {
    pub const MIN_BALANCE_ORDER: u32 = 10;
    pub const MAX_BALANCE_ORDER: u32 = 20;
}

/// Used for testing/benchmarking.
pub fn issue_assets<R: RngCore + CryptoRng>(
    rng: &mut R,
    pub_account: &ElgamalPublicKey,
    init_balance: &CipherText,
    amount: Balance,
) -> CipherText {
    let (_, encrypted_amount) = pub_account.encrypt_value(amount, rng);
    init_balance + encrypted_amount
}

pub fn create_account_with_amount<R: RngCore + CryptoRng>(
    rng: &mut R,
    initial_amount: Balance,
) -> (ElgamalKeys, CipherText) {
    let account = gen_keys(rng);

    let (_, initial_balance) = account.public.encrypt_value(0, rng);
    let initial_balance = if initial_amount > 0 {
        issue_assets(rng, &account.public, &initial_balance, initial_amount)
    } else {
        initial_balance
    };

    (account, initial_balance)
}

pub fn gen_keys<R: RngCore + CryptoRng>(rng: &mut R) -> ElgamalKeys {
    let elg_secret = ElgamalSecretKey::random(rng);
    let elg_pub = elg_secret.get_public_key();
    ElgamalKeys {
        public: elg_pub,
        secret: elg_secret,
    }
}

/// A decryptor with a small table that builds in milliseconds.
pub fn small_decryptor(table_size: usize) -> Result<BalanceDecryptor> {
    BalanceDecryptor::new(DecryptorConfig {
        default_table_size: table_size,
        build_check_interval: 256,
        poll_interval: Duration::from_millis(1),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decryptor::{silent, StopSignal};
    use rand::{rngs::StdRng, SeedableRng};

    const SEED_1: [u8; 32] = [42u8; 32];

    #[test]
    fn account_with_amount_decrypts() {
        let mut rng = StdRng::from_seed(SEED_1);
        let (account, balance) = create_account_with_amount(&mut rng, 1_000);
        assert!(account.secret.verify(&balance, 1_000).is_ok());

        let balance = issue_assets(&mut rng, &account.public, &balance, 234);
        let decryptor = small_decryptor(256).unwrap();
        assert_eq!(
            account
                .secret
                .decrypt(&decryptor, &balance, 0, &StopSignal::new(), &silent()),
            Ok(1_234)
        );
    }
}
