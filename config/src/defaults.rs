//! Built-in schema description and worked examples for the DVD rental sample database.

/// Table and column listing handed to the agent as context.
pub const DVD_RENTAL_SCHEMA: &str = r"- Table `actor`: `actor_id`, `first_name`, `last_name`, `last_update`
- Table `actor_info`: `actor_id`, `first_name`, `last_name`, `film_info`
- Table `address`: `address_id`, `address`, `address2`, `district`, `city_id`, `postal_code`, `phone`, `last_update`
- Table `category`: `category_id`, `name`, `last_update`
- Table `city`: `city_id`, `city`, `country_id`, `last_update`
- Table `country`: `country_id`, `country`, `last_update`
- Table `customer`: `customer_id`, `store_id`, `first_name`, `last_name`, `email`, `address_id`, `activebool`, `create_date`, `last_update`, `active`
- Table `customer_list`: `id`, `name`, `address`, `zip code`, `phone`, `city`, `country`, `notes`, `sid`
- Table `film`: `film_id`, `title`, `description`, `release_year`, `language_id`, `rental_duration`, `rental_rate`, `length`, `replacement_cost`, `rating`, `last_update`, `special_features`, `fulltext`
- Table `film_actor`: `actor_id`, `film_id`, `last_update`
- Table `film_category`: `film_id`, `category_id`, `last_update`
- Table `inventory`: `inventory_id`, `film_id`, `store_id`, `last_update`
- Table `language`: `language_id`, `name`, `last_update`
- Table `nicer_but_slower_film_list`: `fid`, `title`, `description`, `category`, `price`, `length`, `rating`, `actors`
- Table `payment`: `payment_id`, `customer_id`, `staff_id`, `rental_id`, `amount`, `payment_date`
- Table `rental`: `rental_id`, `rental_date`, `inventory_id`, `customer_id`, `return_date`, `staff_id`, `last_update`
- Table `sales_by_film_category`: `category`, `total_sales`
- Table `sales_by_store`: `store`, `manager`, `total_sales`
- Table `staff`: `staff_id`, `first_name`, `last_name`, `address_id`, `email`, `store_id`, `active`, `username`, `password`, `last_update`, `picture`
- Table `staff_list`: `id`, `name`, `address`, `zip code`, `phone`, `city`, `country`, `sid`
- Table `store`: `store_id`, `manager_staff_id`, `address_id`, `last_update`";

/// Few-shot transcripts, in the order they appear in the prompt.
pub const DVD_RENTAL_EXAMPLES: &[&str] = &[
    "Question: What is the total number of actors?\n\
     Thought: The user wants to count the total number of actors. The `actor` table is the correct place to find this. I will count all rows in the table.\n\
     Action: sql_db_query\n\
     Action Input: SELECT COUNT(*) FROM actor;\n\
     Observation: [(200,)]\n\
     Thought: The query returned a single value. I now know the final answer.\n\
     Final Answer: There are 200 actors in the database.",
    "Question: List all films with the least rental duration.\n\
     Thought: I need to find the film with the shortest rental duration. The `film` table has a `rental_duration` column. I can query this table directly to find the film(s) with the minimum duration. I will use ORDER BY and LIMIT to get the result efficiently, selecting only the film title.\n\
     Action: sql_db_query\n\
     Action Input: SELECT title FROM film ORDER BY rental_duration ASC LIMIT 1;\n\
     Observation: [('WONDERFUL FISH',)]\n\
     Thought: The query returned a single value. I now know the final answer.\n\
     Final Answer: The film with the least rental duration is 'WONDERFUL FISH'.",
    "Question: Which country has the most cities?\n\
     Thought: To find out which country has the most cities, I need to join the `city` table with the `country` table on `country_id`. Then, I will count the number of cities for each country and order the results to find the highest count. I must remember to use the correct alias for the country name in the `SELECT` and `GROUP BY` clauses.\n\
     Action: sql_db_query\n\
     Action Input: SELECT co.country, COUNT(c.city) AS num_cities FROM city c JOIN country co ON c.country_id = co.country_id GROUP BY co.country ORDER BY num_cities DESC LIMIT 1;\n\
     Observation: [('India', 60)]\n\
     Thought: The query returned a single value. I now know the final answer.\n\
     Final Answer: India has the most cities, with a total of 60 cities.",
    "Question: Which customer has rented the most films?\n\
     Thought: To find the customer who has rented the most films, I need to count the number of rentals for each customer. This requires joining the customer table with the rental table on customer_id. I will then group the results by customer and order them to find the top customer.\n\
     Action: sql_db_query\n\
     Action Input: SELECT c.first_name, c.last_name, COUNT(r.rental_id) AS rental_count FROM customer AS c JOIN rental AS r ON c.customer_id = r.customer_id GROUP BY c.customer_id ORDER BY rental_count DESC LIMIT 1;\n\
     Observation: [('ELEANOR', 'HUNT', 46)]\n\
     Thought: The query returned a single value. I now know the final answer.\n\
     Final Answer: The customer who has rented the most films is Eleanor Hunt, with 46 rentals.",
    "Question: what is the lowest rental duration for a film\n\
     Thought: The user wants to find the minimum rental duration. The `film` table has a `rental_duration` column. I will use the MIN aggregate function to find the lowest value.\n\
     Action: sql_db_query\n\
     Action Input: SELECT MIN(rental_duration) FROM film;\n\
     Observation: [(3,)]\n\
     Thought: The query returned a single value. I now know the final answer.\n\
     Final Answer: The lowest rental duration for a film is 3 days.",
    "Question: what is the highest rental duration for a film\n\
     Thought: The user wants to find the maximum rental duration. The `film` table has a `rental_duration` column. I will use the MAX aggregate function to find the highest value.\n\
     Action: sql_db_query\n\
     Action Input: SELECT MAX(rental_duration) FROM film;\n\
     Observation: [(7,)]\n\
     Thought: The query returned a single value. I now know the final answer.\n\
     Final Answer: The highest rental duration for a film is 7 days.",
];
