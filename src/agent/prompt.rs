//! Fixed prompt templates for the two model calls in a turn.

/// Default system prompt for the weather domain.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a meteorological assistant that helps users interact with \
historical weather observation data stored in a collection called data under the database sample_weatherdata. \
Your job is to assist users in querying and interpreting weather data, such as air temperature, pressure, wind, \
visibility, and sky condition, by extracting the station identifier (callLetters, e.g., \"PLAT\") and timestamps \
from natural language inputs. Always convert dates and times like \"March 5th, 1984 at 3 PM\" into ISO format \
(YYYY-MM-DDTHH:MM:SS).\n\n\
When users ask for data, identify the station and time, then call the appropriate tool (e.g., get_station_metadata, \
get_temperature_at_time, get_pressure_trend, get_wind_data). If the user does not provide a station or time, ask \
for it or default to the latest available record. Be concise, clear, and technical.";

/// Builds the structured-choice prompt.
pub fn choice_prompt(system_prompt: &str, signatures: &str, user_input: &str) -> String {
    format!(
        "{system_prompt}\n\n\
         Available tools and their exact parameters:\n\
         {signatures}\n\n\
         User Query: {user_input}\n\n\
         Reply only in this JSON format:\n\
         {{\"tool\": \"tool_name\", \"args\": {{\"key\": \"value\"}}}}"
    )
}

/// Builds the prompt that turns a tool result into prose.
pub fn format_prompt(user_query: &str, tool_name: &str, result_json: &str) -> String {
    format!(
        "You are a meteorological assistant. A user asked: \"{user_query}\"\n\n\
         I executed the function '{tool_name}' and received this data:\n\n\
         {result_json}\n\n\
         Please convert this data into a clear, natural, conversational response. Follow these guidelines:\n\
         - Explain what the data shows in simple terms\n\
         - Include specific numbers and details from the data\n\
         - Make it informative but easy to understand\n\
         - If there's an error in the data, explain it helpfully\n\
         - Don't include JSON formatting or raw data in your response\n\
         - Use natural language like you're talking to a person\n\
         - Be concise but complete\n\n\
         Your natural language response:"
    )
}
