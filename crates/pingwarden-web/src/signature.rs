//! 인터랙션 웹훅 서명 검증.
//!
//! 채팅 플랫폼은 `X-Signature-Timestamp` 값과 요청 본문을 이어 붙인 바이트에
//! Ed25519 서명을 하고, 서명과 공개키는 hex 문자열로 주고받는다.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use pingwarden_core::error::CoreError;

/// 서명 헤더
pub const SIGNATURE_HEADER: &str = "x-signature-ed25519";

/// 타임스탬프 헤더
pub const TIMESTAMP_HEADER: &str = "x-signature-timestamp";

/// 인터랙션 서명 검증기
#[derive(Debug, Clone)]
pub struct InteractionVerifier {
    key: VerifyingKey,
}

impl InteractionVerifier {
    /// hex 공개키로 생성
    pub fn from_hex(public_key: &str) -> Result<Self, CoreError> {
        let key_bytes = decode_hex(public_key.trim())
            .ok_or_else(|| CoreError::Startup("공개키 hex 디코딩 실패".to_string()))?;
        let key_len = key_bytes.len();
        let key_array: [u8; 32] = key_bytes.try_into().map_err(|_| {
            CoreError::Startup(format!("공개키 길이 오류: {key_len}바이트 (32바이트 필요)"))
        })?;

        let key = VerifyingKey::from_bytes(&key_array)
            .map_err(|e| CoreError::Startup(format!("공개키 파싱 실패: {e}")))?;
        Ok(Self { key })
    }

    pub fn from_key(key: VerifyingKey) -> Self {
        Self { key }
    }

    /// `timestamp || body`에 대한 hex 서명 검증
    pub fn verify(
        &self,
        timestamp: &str,
        body: &[u8],
        signature_hex: &str,
    ) -> Result<(), CoreError> {
        let signature_bytes = decode_hex(signature_hex.trim())
            .ok_or_else(|| CoreError::Auth("서명 hex 디코딩 실패".to_string()))?;
        let signature_array: [u8; 64] = signature_bytes
            .try_into()
            .map_err(|_| CoreError::Auth("서명 길이 오류 (64바이트 필요)".to_string()))?;
        let signature = Signature::from_bytes(&signature_array);

        let mut message = Vec::with_capacity(timestamp.len() + body.len());
        message.extend_from_slice(timestamp.as_bytes());
        message.extend_from_slice(body);

        self.key
            .verify(&message, &signature)
            .map_err(|e| CoreError::Auth(format!("서명 검증 실패: {e}")))
    }
}

/// hex 문자열 디코딩 (대소문자 무관). 형식이 틀리면 None.
pub fn decode_hex(input: &str) -> Option<Vec<u8>> {
    if input.len() % 2 != 0 {
        return None;
    }

    input
        .as_bytes()
        .chunks(2)
        .map(|pair| {
            let high = (pair[0] as char).to_digit(16)?;
            let low = (pair[1] as char).to_digit(16)?;
            Some((high * 16 + low) as u8)
        })
        .collect()
}
