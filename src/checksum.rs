/// Soma de complemento de um em 16 bits, com "end-around carry".
pub fn ones_complement_add(a: u16, b: u16) -> u16 {
    let (sum, carry) = a.overflowing_add(b);
    sum.wrapping_add(carry as u16)
}

/// Calcula o checksum da Internet (RFC 1071 / RFC 792).
///
/// Os bytes são lidos em palavras de 16 bits na ordem de rede. Se o tamanho
/// for ímpar, o último byte é completado com um zero apenas para o cálculo.
/// O valor devolvido deve ser escrito no pacote com `to_be_bytes`.
pub fn internet_checksum(data: &[u8]) -> u16 {
    let mut chunks = data.chunks_exact(2);
    let mut sum = chunks
        .by_ref()
        .map(|w| u16::from_be_bytes([w[0], w[1]]))
        .fold(0u16, ones_complement_add);

    if let [last] = chunks.remainder() {
        sum = ones_complement_add(sum, u16::from_be_bytes([*last, 0]));
    }

    !sum
}
