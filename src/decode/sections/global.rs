use crate::core::indices::IndexBounds;
use crate::core::sections::{Global, GlobalSection};
use crate::core::types::GlobalType;
use crate::decode::helpers::{DecodeVectorError, ParseExpressionError, decode_expr, decode_vector};
use crate::decode::types::DecodeGlobalTypeError;
use std::io::Read;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeGlobalSectionError {
    #[error("failed decoding Global section")]
    DecodeVector(#[from] DecodeVectorError<DecodeGlobalError>),
}

/// `bounds.globals` counts the imported globals; each initializer may refer
/// to those and to the globals defined before it.
pub(crate) fn decode_global_section<R: Read + ?Sized>(
    reader: &mut R,
    bounds: &IndexBounds,
) -> Result<GlobalSection, DecodeGlobalSectionError> {
    let mut visible = bounds.constant();
    let mut globals = GlobalSection::default();

    for global in decode_vector(reader, |r| {
        let global = parse_global(r, &visible)?;
        visible.globals += 1;
        Ok::<_, DecodeGlobalError>(global)
    })? {
        globals.push(global);
    }

    Ok(globals)
}

#[derive(Debug, Error)]
pub enum DecodeGlobalError {
    #[error(transparent)]
    DecodeGlobalType(#[from] DecodeGlobalTypeError),

    #[error("failed decoding Init")]
    DecodeInit(#[from] ParseExpressionError),
}

fn parse_global<R: Read + ?Sized>(
    reader: &mut R,
    bounds: &IndexBounds,
) -> Result<Global, DecodeGlobalError> {
    Ok(Global {
        r#type: GlobalType::decode(reader)?,
        init: decode_expr(reader, bounds)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::indices::GlobalIdx;
    use crate::core::instruction::Instruction;
    use crate::decode::instructions::ParseError;
    use std::io::Cursor;

    #[test]
    fn initializers_only_see_earlier_globals() {
        // (global i32 (i32.const 7)) (global i32 (global.get 0))
        let ok = [0x02, 0x7F, 0x00, 0x41, 0x07, 0x0B, 0x7F, 0x00, 0x23, 0x00, 0x0B];
        let globals = decode_global_section(&mut Cursor::new(ok), &IndexBounds::default()).unwrap();
        assert_eq!(globals.len(), 2);
        assert_eq!(globals.entries()[1].init, vec![Instruction::GlobalGet(GlobalIdx(0))]);

        // (global i32 (global.get 0)) refers to itself
        let bad = [0x01, 0x7F, 0x00, 0x23, 0x00, 0x0B];
        let err = decode_global_section(&mut Cursor::new(bad), &IndexBounds::default()).unwrap_err();
        match err {
            DecodeGlobalSectionError::DecodeVector(DecodeVectorError::ParseElement {
                source:
                    DecodeGlobalError::DecodeInit(ParseExpressionError::ParseInstruction(
                        ParseError::Unresolved(_),
                    )),
                ..
            }) => {}
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
