use crate::error::Error;
use crate::types::XdmValue;

pub fn fn_true<N: Clone>(args: Vec<XdmValue<N>>) -> Result<XdmValue<N>, Error> {
    if !args.is_empty() {
        return Err(Error::function("true", "expected 0 arguments"));
    }
    Ok(XdmValue::from_bool(true))
}

pub fn fn_false<N: Clone>(args: Vec<XdmValue<N>>) -> Result<XdmValue<N>, Error> {
    if !args.is_empty() {
        return Err(Error::function("false", "expected 0 arguments"));
    }
    Ok(XdmValue::from_bool(false))
}

pub fn fn_not<N: Clone>(mut args: Vec<XdmValue<N>>) -> Result<XdmValue<N>, Error> {
    if args.len() != 1 {
        return Err(Error::function("not", "expected 1 argument"));
    }
    let value = args.remove(0);
    Ok(XdmValue::from_bool(!value.effective_boolean_value()))
}

pub fn fn_boolean<N: Clone>(mut args: Vec<XdmValue<N>>) -> Result<XdmValue<N>, Error> {
    if args.len() != 1 {
        return Err(Error::function("boolean", "expected 1 argument"));
    }
    let value = args.remove(0);
    Ok(XdmValue::from_bool(value.effective_boolean_value()))
}
