// serialize.rs — Canonical FPT1 byte layout of a template.
//
//   "FPT1" | u16 minutia_count | u16 core_count | f32 spectral_q | f32 spatial_q
//   per minutia: u32 id | u16 x | u16 y | f32 angle | u8 kind | u8 K
//                K(K−1)/2 × (f32 ratio | f32 interior_angle | u8 kind_a | u8 kind_b)
//   per core:    u32 id | u16 x | u16 y | f32 angle | u8 kind
//
// Little-endian throughout, floats as IEEE-754 binary32 bit patterns, so
// decoding an encoded template gives back the same bits.

use nom::bytes::complete::tag;
use nom::combinator::map_opt;
use nom::multi::count;
use nom::number::complete::{le_f32, le_u16, le_u32, u8 as byte};
use nom::{IResult, Parser};
use tracing::debug;

use crate::error::{FingerprintError, Result};
use crate::template::{CoreKind, CorePoint, FingerprintTemplate, Minutia, MinutiaKind, TupleDescriptor};

pub const MAGIC: &[u8; 4] = b"FPT1";

const HEADER_LEN: usize = 4 + 2 + 2 + 4 + 4;
const MINUTIA_LEN: usize = 4 + 2 + 2 + 4 + 1 + 1;
const DESCRIPTOR_LEN: usize = 4 + 4 + 1 + 1;
const CORE_LEN: usize = 4 + 2 + 2 + 4 + 1;

/// Neighbor count K whose K(K−1)/2 pairs give `descriptors`.
fn neighbor_count(descriptors: usize) -> Option<u8> {
    (0..=u8::MAX).find(|&k| {
        let k = k as usize;
        k * k.saturating_sub(1) / 2 == descriptors
    })
}

/// Size of the encoding of `template` in bytes.
pub fn encoded_len(template: &FingerprintTemplate) -> usize {
    HEADER_LEN
        + template
            .minutiae()
            .iter()
            .map(|m| MINUTIA_LEN + m.neighborhood.len() * DESCRIPTOR_LEN)
            .sum::<usize>()
        + template.cores().len() * CORE_LEN
}

fn count_u16(n: usize, what: &str) -> Result<[u8; 2]> {
    u16::try_from(n)
        .map(u16::to_le_bytes)
        .map_err(|_| FingerprintError::MalformedInput(format!("{n} {what} do not fit a u16 count")))
}

/// Encode `template` in the FPT1 layout.
///
/// Fails when a count overflows its field or a neighborhood does not hold
/// K(K−1)/2 descriptors for some K.
pub fn to_bytes(template: &FingerprintTemplate) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(encoded_len(template));
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&count_u16(template.minutiae().len(), "minutiae")?);
    out.extend_from_slice(&count_u16(template.cores().len(), "cores")?);
    out.extend_from_slice(&template.spectral_q().to_le_bytes());
    out.extend_from_slice(&template.spatial_q().to_le_bytes());

    for m in template.minutiae() {
        let k = neighbor_count(m.neighborhood.len()).ok_or_else(|| {
            FingerprintError::MalformedInput(format!(
                "minutia {} has {} descriptors, not K(K-1)/2",
                m.id,
                m.neighborhood.len()
            ))
        })?;
        out.extend_from_slice(&m.id.to_le_bytes());
        out.extend_from_slice(&m.x.to_le_bytes());
        out.extend_from_slice(&m.y.to_le_bytes());
        out.extend_from_slice(&m.angle.to_le_bytes());
        out.push(m.kind.code());
        out.push(k);
        for d in &m.neighborhood {
            out.extend_from_slice(&d.ratio.to_le_bytes());
            out.extend_from_slice(&d.interior_angle.to_le_bytes());
            out.push(d.neighbor_a_kind.code());
            out.push(d.neighbor_b_kind.code());
        }
    }

    for c in template.cores() {
        out.extend_from_slice(&c.id.to_le_bytes());
        out.extend_from_slice(&c.x.to_le_bytes());
        out.extend_from_slice(&c.y.to_le_bytes());
        out.extend_from_slice(&c.angle.to_le_bytes());
        out.push(c.kind.code());
    }
    Ok(out)
}

fn magic(i: &[u8]) -> IResult<&[u8], &[u8]> {
    tag(&MAGIC[..]).parse(i)
}

fn u8_le(i: &[u8]) -> IResult<&[u8], u8> {
    byte(i)
}

fn u16_le(i: &[u8]) -> IResult<&[u8], u16> {
    le_u16(i)
}

fn u32_le(i: &[u8]) -> IResult<&[u8], u32> {
    le_u32(i)
}

fn f32_le(i: &[u8]) -> IResult<&[u8], f32> {
    le_f32(i)
}

fn minutia_kind(i: &[u8]) -> IResult<&[u8], MinutiaKind> {
    map_opt(u8_le, MinutiaKind::from_code).parse(i)
}

fn core_kind(i: &[u8]) -> IResult<&[u8], CoreKind> {
    map_opt(u8_le, CoreKind::from_code).parse(i)
}

/// (ratio, interior angle, kind A, kind B); the owner comes from the
/// enclosing minutia.
fn descriptor(i: &[u8]) -> IResult<&[u8], (f32, f32, MinutiaKind, MinutiaKind)> {
    (f32_le, f32_le, minutia_kind, minutia_kind).parse(i)
}

fn minutia(i: &[u8]) -> IResult<&[u8], Minutia> {
    let (i, (id, x, y, angle, kind, k)) = (u32_le, u16_le, u16_le, f32_le, minutia_kind, u8_le).parse(i)?;
    let k = k as usize;
    let (i, raw) = count(descriptor, k * k.saturating_sub(1) / 2).parse(i)?;
    let neighborhood = raw
        .into_iter()
        .map(|(ratio, interior_angle, neighbor_a_kind, neighbor_b_kind)| TupleDescriptor {
            owner_id: id,
            ratio,
            interior_angle,
            neighbor_a_kind,
            neighbor_b_kind,
        })
        .collect();
    Ok((
        i,
        Minutia {
            id,
            x,
            y,
            angle,
            kind,
            neighborhood,
        },
    ))
}

fn core(i: &[u8]) -> IResult<&[u8], CorePoint> {
    let (i, (id, x, y, angle, kind)) = (u32_le, u16_le, u16_le, f32_le, core_kind).parse(i)?;
    Ok((i, CorePoint::new(id, x, y, angle, kind)))
}

fn template(i: &[u8]) -> IResult<&[u8], FingerprintTemplate> {
    let (i, _) = magic(i)?;
    let (i, (minutia_count, core_count, spectral_q, spatial_q)) = (u16_le, u16_le, f32_le, f32_le).parse(i)?;
    let (i, minutiae) = count(minutia, minutia_count as usize).parse(i)?;
    let (i, cores) = count(core, core_count as usize).parse(i)?;
    Ok((i, FingerprintTemplate::new(minutiae, cores).with_quality(spectral_q, spatial_q)))
}

/// Decode an FPT1 buffer. The whole buffer must be consumed and the result
/// must pass `validate_structure`.
pub fn from_bytes(bytes: &[u8]) -> Result<FingerprintTemplate> {
    let (rest, template) = template(bytes).map_err(|e| {
        let msg = match e {
            nom::Err::Incomplete(_) => "template truncated".to_string(),
            nom::Err::Error(e) | nom::Err::Failure(e) => {
                format!("{:?} at byte {}", e.code, bytes.len() - e.input.len())
            }
        };
        debug!("Rejecting template bytes: {}", msg);
        FingerprintError::MalformedInput(msg)
    })?;
    if !rest.is_empty() {
        return Err(FingerprintError::MalformedInput(format!(
            "{} trailing bytes after template",
            rest.len()
        )));
    }
    template
        .validate_structure()
        .map_err(|e| FingerprintError::MalformedInput(e.to_string()))?;
    Ok(template)
}
